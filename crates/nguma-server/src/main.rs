mod config;
mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nguma_api::middleware::bearer_token;
use nguma_api::{AppState, AppStateInner, ServiceSecrets};
use nguma_assistant::{GeminiClient, LanguageModel, Responder};
use nguma_db::Database;
use nguma_gateway::auth::verify_token;
use nguma_gateway::connection;
use nguma_gateway::dispatcher::Dispatcher;
use nguma_mail::{MailSettings, MailTransport, Mailer, ResendTransport, UnconfiguredTransport};

use crate::config::Config;

#[derive(Clone)]
struct ServerState {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nguma=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let dispatcher = Dispatcher::new();

    let mut gemini = GeminiClient::new(config.gemini_api_key, config.gemini_model)?;
    if let Some(base_url) = config.gemini_base_url {
        gemini = gemini.with_base_url(base_url);
    }
    let model: Arc<dyn LanguageModel> = Arc::new(gemini);
    let responder = Arc::new(Responder::new(db.clone(), model, config.assistant));

    let transport: Arc<dyn MailTransport> = match config.resend_api_key {
        Some(key) => Arc::new(ResendTransport::new(key)?),
        None => {
            warn!("RESEND_API_KEY is not set; email sends will fail");
            Arc::new(UnconfiguredTransport)
        }
    };
    let mailer = Arc::new(Mailer::new(
        transport,
        MailSettings {
            site_url: config.site_url,
            from_domain: config.resend_from_domain,
        },
    )?);

    if config.queue_interval_secs > 0 {
        tokio::spawn(worker::run_queue_loop(
            db.clone(),
            mailer.clone(),
            config.queue_interval_secs,
            config.queue_batch_size,
        ));
    }

    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        dispatcher: dispatcher.clone(),
        responder,
        mailer,
        jwt_secret: config.jwt_secret.clone(),
        secrets: ServiceSecrets {
            service_key: config.service_key,
            internal_secret: config.internal_secret,
            cron_secret: config.cron_secret,
        },
        auto_reply: config.auto_reply,
        queue_batch_size: config.queue_batch_size,
    });

    let state = ServerState {
        db,
        dispatcher,
        jwt_secret: config.jwt_secret,
    };

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .route("/health", get(health))
        .merge(nguma_api::router(app_state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Nguma support server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// A bearer token at upgrade time authenticates immediately; otherwise the
/// client must send `Identify` once connected.
async fn ws_upgrade(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    match bearer_token(&headers) {
        Some(token) => {
            let Some(claims) = verify_token(token, &state.jwt_secret) else {
                return StatusCode::UNAUTHORIZED.into_response();
            };
            ws.on_upgrade(move |socket| {
                connection::handle_connection_authenticated(
                    socket,
                    state.dispatcher,
                    state.db,
                    claims.sub,
                )
            })
        }
        None => ws.on_upgrade(move |socket| {
            connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
        }),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
