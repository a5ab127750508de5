use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use nguma_types::api::{BackfillResponse, CreateKnowledgeRequest, EmbedRequest, EmbedResponse};

use crate::error::ApiError;
use crate::middleware::Caller;
use crate::state::AppState;

/// Documents embedded per backfill run.
const BACKFILL_BATCH: usize = 100;

/// Pause between provider calls during a backfill.
const BACKFILL_PAUSE: Duration = Duration::from_millis(600);

/// Users reach the embedding endpoints only with the admin role.
async fn ensure_admin(state: &AppState, caller: &Caller) -> Result<(), ApiError> {
    let Caller::User(claims) = caller else {
        return Ok(());
    };
    let user_id = claims.sub;
    if state.blocking(move |db| db.is_admin(user_id)).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

/// Text embedded for a knowledge document.
fn document_text(title: &str, content: &str) -> String {
    format!("{}\n\n{}", title, content)
}

/// `POST /functions/v1/generate-embedding`
pub async fn generate_embedding(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&state, &caller).await?;
    let Json(req) = payload.map_err(|_| ApiError::BadRequest("Content is required".into()))?;
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".into()));
    }

    let embedding = state
        .responder
        .model()
        .embed(&req.content)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to generate embedding: {}", e)))?;

    if let Some(id) = req.id {
        let stored = embedding.clone();
        let updated = state
            .blocking(move |db| db.set_embedding(id, &stored))
            .await?;
        if !updated {
            return Err(ApiError::NotFound("Knowledge document not found".into()));
        }
    }

    Ok(Json(EmbedResponse {
        embedding,
        success: true,
    }))
}

/// `POST /functions/v1/generate-knowledge-embeddings`
///
/// Embeds active documents that have none yet. A failed document is counted
/// and skipped.
pub async fn backfill_embeddings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&state, &caller).await?;

    let documents = state
        .blocking(|db| db.documents_missing_embedding(BACKFILL_BATCH))
        .await?;
    let model = state.responder.model().clone();

    let mut result = BackfillResponse::default();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(BACKFILL_PAUSE).await;
        }

        let embedding = match model.embed(&document_text(&doc.title, &doc.content)).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding failed for document {}: {}", doc.id, e);
                result.failed += 1;
                continue;
            }
        };

        let id = doc.id;
        match state.blocking(move |db| db.set_embedding(id, &embedding)).await {
            Ok(_) => result.processed += 1,
            Err(_) => result.failed += 1,
        }
    }

    result.remaining = state.blocking(|db| db.count_missing_embeddings()).await?;
    info!(
        "Knowledge backfill: {} embedded, {} failed, {} remaining",
        result.processed, result.failed, result.remaining
    );
    Ok(Json(result))
}

/// `POST /admin/knowledge`
///
/// The document is stored first. If embedding it fails, it is returned
/// without one and the next backfill picks it up.
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<CreateKnowledgeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Err(ApiError::BadRequest("Title and content are required".into()));
    }

    let text = document_text(&title, &content);
    let category = req.category;
    let doc = state
        .blocking(move |db| db.insert_document(&title, &content, category.as_deref()))
        .await?;

    let doc = match state.responder.model().embed(&text).await {
        Ok(embedding) => {
            let id = doc.id;
            state
                .blocking(move |db| {
                    db.set_embedding(id, &embedding)?;
                    db.get_document(id)
                })
                .await?
                .unwrap_or(doc)
        }
        Err(e) => {
            warn!("Stored document {} without embedding: {}", doc.id, e);
            doc
        }
    };

    Ok((StatusCode::CREATED, Json(doc)))
}
