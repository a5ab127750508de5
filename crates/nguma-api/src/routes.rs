use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::{
    require_admin, require_auth, require_cron, require_service, require_service_or_user,
};
use crate::state::AppState;
use crate::{chat, conversations, email, knowledge, notifications, queue};

/// Every HTTP route except `/health` and the `/gateway` upgrade, which the
/// binary owns.
pub fn router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/functions/v1/chat-ai", post(chat::chat_ai))
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/conversations/current", get(conversations::current_conversation))
        .route("/conversations/{conversation_id}", get(conversations::get_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/conversations/{conversation_id}/read", post(conversations::mark_read))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_notification_read),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // Layers run outside-in: authenticate, then check the role.
    let admin_routes = Router::new()
        .route("/admin/conversations", get(conversations::admin_list_conversations))
        .route(
            "/admin/conversations/{conversation_id}/close",
            post(conversations::close_conversation),
        )
        .route("/admin/knowledge", post(knowledge::create_document))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let function_routes = Router::new()
        .route("/functions/v1/send-resend-email", post(email::send_resend_email))
        .route("/functions/v1/generate-embedding", post(knowledge::generate_embedding))
        .route(
            "/functions/v1/generate-knowledge-embeddings",
            post(knowledge::backfill_embeddings),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_or_user,
        ))
        .with_state(state.clone());

    let service_routes = Router::new()
        .route("/functions/v1/enqueue-email", post(queue::enqueue_email))
        .route(
            "/functions/v1/send-email-notification",
            post(email::send_notification_email),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_service))
        .with_state(state.clone());

    let cron_routes = Router::new()
        .route("/functions/v1/process-notification-queue", post(queue::process_queue))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_cron))
        .with_state(state);

    Router::new()
        .merge(user_routes)
        .merge(admin_routes)
        .merge(function_routes)
        .merge(service_routes)
        .merge(cron_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures_util::future::BoxFuture;
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use nguma_assistant::{
        AssistantConfig, Generation, GenerationRequest, LanguageModel, ModelError, Responder,
    };
    use nguma_db::Database;
    use nguma_db::queries::ADMIN_ROLE;
    use nguma_gateway::dispatcher::{Dispatch, Dispatcher};
    use nguma_mail::{MailError, MailSettings, MailTransport, Mailer, OutgoingEmail};
    use nguma_types::api::Claims;
    use nguma_types::models::{AI_SENDER_ID, QueueStatus, UserProfile};
    use tokio::sync::broadcast;

    use crate::state::{AppStateInner, ServiceSecrets};

    const JWT_SECRET: &str = "test-jwt-secret";
    const SERVICE_KEY: &str = "service-key";
    const INTERNAL_SECRET: &str = "internal-secret";
    const CRON_SECRET: &str = "cron-secret";

    struct FakeModel {
        embed_calls: AtomicUsize,
    }

    impl LanguageModel for FakeModel {
        fn name(&self) -> &str {
            "fake"
        }

        fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, ModelError>> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(vec![1.0, 0.0, 0.0]) })
        }

        fn generate<'a>(
            &'a self,
            _request: &'a GenerationRequest,
        ) -> BoxFuture<'a, Result<Generation, ModelError>> {
            Box::pin(async {
                Ok(Generation {
                    text: "Les retraits sont traités sous 48h.".into(),
                    truncated: false,
                })
            })
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl MailTransport for RecordingTransport {
        fn name(&self) -> &str {
            "recording"
        }

        fn send<'a>(
            &'a self,
            email: &'a OutgoingEmail,
        ) -> BoxFuture<'a, Result<String, MailError>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(email.clone());
                Ok("re_1".to_string())
            })
        }
    }

    struct TestApp {
        router: Router,
        state: AppState,
        model: Arc<FakeModel>,
        transport: Arc<RecordingTransport>,
    }

    fn setup() -> TestApp {
        setup_with(false)
    }

    fn setup_with(auto_reply: bool) -> TestApp {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let model = Arc::new(FakeModel {
            embed_calls: AtomicUsize::new(0),
        });
        let transport = Arc::new(RecordingTransport::default());
        let mailer = Mailer::new(
            transport.clone(),
            MailSettings {
                site_url: "https://nguma.org".into(),
                from_domain: "updates.nguma.org".into(),
            },
        )
        .unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db: db.clone(),
            dispatcher: Dispatcher::new(),
            responder: Arc::new(Responder::new(db, model.clone(), AssistantConfig::default())),
            mailer: Arc::new(mailer),
            jwt_secret: JWT_SECRET.into(),
            secrets: ServiceSecrets {
                service_key: SecretString::from(SERVICE_KEY.to_string()),
                internal_secret: Some(SecretString::from(INTERNAL_SECRET.to_string())),
                cron_secret: SecretString::from(CRON_SECRET.to_string()),
            },
            auto_reply,
            queue_batch_size: 50,
        });

        TestApp {
            router: router(state.clone()),
            state,
            model,
            transport,
        }
    }

    fn token(user_id: Uuid) -> String {
        let claims = Claims {
            sub: user_id,
            email: Some("user@example.com".into()),
            role: Some("authenticated".into()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", format!("Bearer {}", auth));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// The next assistant message broadcast on the gateway, if one arrives in time.
    async fn next_assistant_message(
        events: &mut broadcast::Receiver<Dispatch>,
        wait: Duration,
    ) -> Option<Value> {
        let found = tokio::time::timeout(wait, async {
            loop {
                let dispatch = events.recv().await.ok()?;
                if dispatch.kind != "MessageCreate" {
                    continue;
                }
                let event: Value = serde_json::from_str(&dispatch.json).ok()?;
                let message = event["data"]["message"].clone();
                if message["sender_id"] == AI_SENDER_ID.to_string() {
                    return Some(message);
                }
            }
        })
        .await;
        found.ok().flatten()
    }

    fn make_admin(app: &TestApp) -> Uuid {
        let admin = Uuid::new_v4();
        app.state.db.set_role(admin, ADMIN_ROLE).unwrap();
        admin
    }

    #[tokio::test]
    async fn routes_require_a_token() {
        let app = setup();
        let (status, body) = call(&app, request("GET", "/conversations", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) = call(&app, request("GET", "/conversations", Some("garbage"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_message_notifies_admins() {
        let app = setup();
        let admin = make_admin(&app);
        let user = Uuid::new_v4();
        app.state
            .db
            .upsert_profile(&UserProfile {
                id: user,
                email: Some("awa@example.com".into()),
                first_name: Some("Awa".into()),
                last_name: Some("Mbuyi".into()),
                ..Default::default()
            })
            .unwrap();
        let user_token = token(user);

        let (status, conversation) =
            call(&app, request("POST", "/conversations", Some(&user_token), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(conversation["subject"], "Conversation de support");
        let id = conversation["id"].as_str().unwrap().to_string();

        let (status, message) = call(
            &app,
            request(
                "POST",
                &format!("/conversations/{}/messages", id),
                Some(&user_token),
                Some(json!({ "message": "  Comment retirer mes fonds vers mon compte mobile  " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["message"], "Comment retirer mes fonds vers mon compte mobile");
        assert_eq!(message["is_admin"], false);

        let (_, conversation) = call(
            &app,
            request("GET", &format!("/conversations/{}", id), Some(&user_token), None),
        )
        .await;
        assert_eq!(conversation["title"], "Comment retirer mes fonds vers mon...");
        assert_eq!(conversation["admin_unread_count"], 1);

        let (status, notifications) =
            call(&app, request("GET", "/notifications", Some(&token(admin)), None)).await;
        assert_eq!(status, StatusCode::OK);
        let notifications = notifications.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["message"], "Nouveau message de support de Awa Mbuyi");
        assert_eq!(notifications[0]["priority"], "medium");
        assert_eq!(
            notifications[0]["link_to"],
            format!("/admin/support?conversation={}", id)
        );
    }

    #[tokio::test]
    async fn admin_reply_notifies_owner_and_read_clears_counter() {
        let app = setup();
        let admin = make_admin(&app);
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();

        let (status, message) = call(
            &app,
            request(
                "POST",
                &format!("/conversations/{}/messages", conversation.id),
                Some(&token(admin)),
                Some(json!({ "message": "Bonjour, nous regardons votre dossier." })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["is_admin"], true);

        let user_token = token(user);
        let (_, notifications) =
            call(&app, request("GET", "/notifications?unread_only=true", Some(&user_token), None))
                .await;
        let notifications = notifications.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["priority"], "high");
        assert_eq!(notifications[0]["link_to"], "/support");

        let notification_id = notifications[0]["id"].as_str().unwrap();
        let (status, _) = call(
            &app,
            request(
                "POST",
                &format!("/notifications/{}/read", notification_id),
                Some(&user_token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, conversation) = call(
            &app,
            request(
                "POST",
                &format!("/conversations/{}/read", conversation.id),
                Some(&user_token),
                None,
            ),
        )
        .await;
        assert_eq!(conversation["user_unread_count"], 0);
    }

    #[tokio::test]
    async fn strangers_cannot_read_a_conversation() {
        let app = setup();
        let owner = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(owner, None).unwrap();

        let (status, body) = call(
            &app,
            request(
                "GET",
                &format!("/conversations/{}/messages", conversation.id),
                Some(&token(Uuid::new_v4())),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "User is not the owner of this conversation.");

        let (status, _) = call(
            &app,
            request(
                "GET",
                &format!("/conversations/{}", Uuid::new_v4()),
                Some(&token(owner)),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_ai_answers_greetings_without_the_model() {
        let app = setup();
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/chat-ai",
                Some(&token(user)),
                Some(json!({ "conversationId": conversation.id, "message": "Bonjour !" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shouldEscalate"], false);
        assert!(!body["reply"].as_str().unwrap().is_empty());
        assert_eq!(app.model.embed_calls.load(Ordering::SeqCst), 0);

        let stored = app.state.db.list_messages(conversation.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_from_assistant());
    }

    #[tokio::test]
    async fn chat_ai_validates_input_and_ownership() {
        let app = setup();
        let user = Uuid::new_v4();

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/chat-ai",
                Some(&token(user)),
                Some(json!({ "message": "Bonjour" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message and conversationId are required");

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/functions/v1/chat-ai",
                Some(&token(user)),
                Some(json!({ "conversationId": Uuid::new_v4(), "message": "Bonjour" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_ai_escalates_without_knowledge() {
        let app = setup();
        let admin = make_admin(&app);
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/chat-ai",
                Some(&token(user)),
                Some(json!({
                    "conversationId": conversation.id,
                    "message": "Pourquoi mon contrat a-t-il été suspendu ?"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shouldEscalate"], true);
        assert_eq!(app.state.db.list_notifications(admin, true).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_routes_check_the_role() {
        let app = setup();
        let admin = make_admin(&app);
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();
        let uri = format!("/admin/conversations/{}/close", conversation.id);

        let (status, _) = call(&app, request("POST", &uri, Some(&token(user)), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, closed) = call(&app, request("POST", &uri, Some(&token(admin)), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(closed["status"], "closed");

        let (_, listed) = call(
            &app,
            request("GET", "/admin/conversations?status=closed", Some(&token(admin)), None),
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, doc) = call(
            &app,
            request(
                "POST",
                "/admin/knowledge",
                Some(&token(admin)),
                Some(json!({
                    "title": "Retraits",
                    "content": "Les retraits sont traités sous 48h."
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(doc["has_embedding"], true);
    }

    #[tokio::test]
    async fn email_relay_validates_before_sending() {
        let app = setup();

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-resend-email",
                None,
                Some(json!({ "template_id": "withdrawal_otp", "to": "awa@example.com" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-resend-email",
                Some(SERVICE_KEY),
                Some(json!({
                    "template_id": "withdrawal_otp",
                    "to": "awa@example.com",
                    "name": "Awa"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("otp_code"));

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-resend-email",
                Some(SERVICE_KEY),
                Some(json!({ "template_id": "no_such_template", "to": "awa@example.com" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.transport.sent.lock().unwrap().is_empty());

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-resend-email",
                Some(&token(Uuid::new_v4())),
                Some(json!({
                    "template_id": "withdrawal_otp",
                    "to": "awa@example.com",
                    "name": "Awa",
                    "amount": 100,
                    "otp_code": "482913"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "id": "re_1" }));
        assert!(app.transport.sent.lock().unwrap()[0].html.contains("482913"));
    }

    #[tokio::test]
    async fn queue_records_each_outcome() {
        let app = setup();

        let enqueue = |params: Value| {
            let mut req = request(
                "POST",
                "/functions/v1/enqueue-email",
                None,
                Some(json!({
                    "template_id": "deposit_approved",
                    "recipient_email": "awa@example.com",
                    "notification_params": params
                })),
            );
            req.headers_mut()
                .insert("x-internal-secret", INTERNAL_SECRET.parse().unwrap());
            req
        };

        let (status, ok) = call(&app, enqueue(json!({ "name": "Awa", "amount": 250 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, bad) = call(&app, enqueue(json!({ "name": "Awa" }))).await;

        let (status, _) = call(
            &app,
            request("POST", "/functions/v1/process-notification-queue", Some(SERVICE_KEY), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, run) = call(
            &app,
            request("POST", "/functions/v1/process-notification-queue", Some(CRON_SECRET), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run, json!({ "processed": 2, "sent": 1, "failed": 1 }));

        let ok_id = Uuid::parse_str(ok["id"].as_str().unwrap()).unwrap();
        let bad_id = Uuid::parse_str(bad["id"].as_str().unwrap()).unwrap();
        assert_eq!(
            app.state.db.get_queued_email(ok_id).unwrap().unwrap().status,
            QueueStatus::Sent
        );
        let failed = app.state.db.get_queued_email(bad_id).unwrap().unwrap();
        assert_eq!(failed.status, QueueStatus::Failed);
        assert_eq!(failed.retry_attempts, 1);
        assert!(failed.last_error.unwrap().contains("amount"));
    }

    #[tokio::test]
    async fn embedding_requires_service_or_admin() {
        let app = setup();
        let doc = app
            .state
            .db
            .insert_document("Dépôts", "Les dépôts sont crédités sous 24h.", None)
            .unwrap();

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/functions/v1/generate-embedding",
                Some(&token(Uuid::new_v4())),
                Some(json!({ "content": "dépôt" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut req = request(
            "POST",
            "/functions/v1/generate-embedding",
            None,
            Some(json!({ "id": doc.id, "content": "Les dépôts sont crédités sous 24h." })),
        );
        req.headers_mut().insert("apikey", SERVICE_KEY.parse().unwrap());
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedding"], json!([1.0, 0.0, 0.0]));
        assert!(app.state.db.get_document(doc.id).unwrap().unwrap().has_embedding);

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/generate-knowledge-embeddings",
                Some(SERVICE_KEY),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "processed": 0, "failed": 0, "remaining": 0 }));
    }

    #[tokio::test]
    async fn user_message_gets_an_assistant_reply() {
        let app = setup_with(true);
        let doc = app
            .state
            .db
            .insert_document("Retraits", "Les retraits sont traités sous 48h.", None)
            .unwrap();
        app.state.db.set_embedding(doc.id, &[1.0, 0.0, 0.0]).unwrap();
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();
        let mut events = app.state.dispatcher.subscribe();

        let (status, _) = call(
            &app,
            request(
                "POST",
                &format!("/conversations/{}/messages", conversation.id),
                Some(&token(user)),
                Some(json!({ "message": "Combien de temps prend un retrait ?" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let broadcast = next_assistant_message(&mut events, Duration::from_secs(5))
            .await
            .expect("assistant reply was not broadcast");
        assert_eq!(broadcast["message"], "Les retraits sont traités sous 48h.");
        assert_eq!(broadcast["conversation_id"], conversation.id.to_string());

        let stored = app.state.db.list_messages(conversation.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[1].is_from_assistant());
        assert_eq!(stored[1].message, "Les retraits sont traités sous 48h.");
    }

    #[tokio::test]
    async fn admin_message_does_not_wake_the_assistant() {
        let app = setup_with(true);
        let admin = make_admin(&app);
        let user = Uuid::new_v4();
        let conversation = app.state.db.create_conversation(user, None).unwrap();
        let mut events = app.state.dispatcher.subscribe();

        let (status, _) = call(
            &app,
            request(
                "POST",
                &format!("/conversations/{}/messages", conversation.id),
                Some(&token(admin)),
                Some(json!({ "message": "Bonjour, votre retrait est en cours." })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        assert!(
            next_assistant_message(&mut events, Duration::from_millis(300))
                .await
                .is_none()
        );
        assert_eq!(app.model.embed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.state.db.list_messages(conversation.id).unwrap().len(), 1);

        // Only the owner's own words name the conversation.
        let conversation = app.state.db.get_conversation(conversation.id).unwrap().unwrap();
        assert!(conversation.title.is_none());
    }

    #[tokio::test]
    async fn notification_email_goes_to_the_profile_address() {
        let app = setup();
        let user = Uuid::new_v4();
        app.state
            .db
            .upsert_profile(&UserProfile {
                id: user,
                email: Some("awa@example.com".into()),
                ..Default::default()
            })
            .unwrap();
        let record = |user_id: Uuid| {
            json!({
                "record": {
                    "id": Uuid::new_v4(),
                    "user_id": user_id,
                    "message": "Votre retrait a été approuvé",
                    "link_to": "/wallet",
                    "type": "transaction",
                    "priority": "urgent"
                }
            })
        };

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-email-notification",
                Some(&token(user)),
                Some(record(user)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let stranger = Uuid::new_v4();
        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-email-notification",
                Some(SERVICE_KEY),
                Some(record(stranger)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Email not found for user {}", stranger));
        assert!(app.transport.sent.lock().unwrap().is_empty());

        let (status, body) = call(
            &app,
            request(
                "POST",
                "/functions/v1/send-email-notification",
                Some(SERVICE_KEY),
                Some(record(user)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email sent successfully");
        assert_eq!(body["resendId"], "re_1");

        let sent = app.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["awa@example.com".to_string()]);
        assert_eq!(sent[0].subject, "Nouvelle notification de Nguma");
        assert!(sent[0].html.contains("URGENT"));
        assert!(sent[0].html.contains(r#"href="https://nguma.org/wallet""#));
    }
}
