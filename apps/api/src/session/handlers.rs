//! Axum route handlers for the Session API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::UploadedDocument;
use crate::llm_client::Credential;
use crate::progress::Progress;
use crate::session::slot::SlotId;
use crate::session::{ComparisonView, SessionView};
use crate::state::AppState;

/// Multipart field that carries the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    let entry = state.sessions.create().await;
    let view = entry.session.lock().await.view();
    (StatusCode::CREATED, Json(view))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let entry = state.sessions.get(session_id).await?;
    let view = entry.session.lock().await.view();
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {session_id} not found")))
    }
}

/// PUT /api/v1/sessions/:id/credential
///
/// Held in memory for this session only. If both documents are already
/// extracted, the comparison runs before this returns.
pub async fn handle_set_credential(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CredentialRequest>,
) -> Result<Json<SessionView>, AppError> {
    let credential = Credential::new(request.api_key)
        .ok_or_else(|| AppError::Validation("api_key cannot be empty".to_string()))?;
    let entry = state.sessions.get(session_id).await?;
    let view = state.orchestrator.set_credential(&entry, credential).await?;
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id/credential
pub async fn handle_clear_credential(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let entry = state.sessions.get(session_id).await?;
    Ok(Json(state.orchestrator.clear_credential(&entry).await))
}

/// POST /api/v1/sessions/:id/slots/:slot
///
/// Multipart upload (field `file`). Detects the kind from the part's media type,
/// extracts, and compares when this completes the pair.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path((session_id, slot)): Path<(Uuid, SlotId)>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let entry = state.sessions.get(session_id).await?;
    let document = read_file_field(&mut multipart).await?;
    let view = state.orchestrator.upload(&entry, slot, document).await?;
    Ok(Json(view))
}

/// GET /api/v1/sessions/:id/slots/:slot/raw
///
/// The original bytes, for verbatim display (PDF viewer, image preview).
pub async fn handle_raw_document(
    State(state): State<AppState>,
    Path((session_id, slot)): Path<(Uuid, SlotId)>,
) -> Result<Response, AppError> {
    let entry = state.sessions.get(session_id).await?;
    let document = entry
        .session
        .lock()
        .await
        .slot(slot)
        .state
        .document()
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Slot {slot:?} holds no document")))?;

    let headers = [
        (header::CONTENT_TYPE, document.media_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", header_safe(&document.filename)),
        ),
    ];
    Ok((headers, document.bytes()).into_response())
}

/// GET /api/v1/sessions/:id/comparison
///
/// The comparison feature is only offered once a credential is present.
pub async fn handle_get_comparison(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ComparisonView>, AppError> {
    let entry = state.sessions.get(session_id).await?;
    let session = entry.session.lock().await;
    if !session.has_credential() {
        return Err(AppError::MissingCredential);
    }
    Ok(Json(session.view().comparison))
}

/// GET /api/v1/sessions/:id/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Progress>, AppError> {
    let entry = state.sessions.get(session_id).await?;
    Ok(Json(entry.progress.current()))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedDocument::new(filename, media_type, bytes));
    }
    Err(AppError::Validation(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(err.body_text())
    }
}

/// Keeps a filename usable inside a quoted header parameter.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
