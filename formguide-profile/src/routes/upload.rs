use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use formguide_shared::errors::{AppError, AppResult, ErrorCode};
use formguide_shared::types::auth::AuthUser;
use formguide_shared::types::ApiResponse;

use crate::models::Profile;
use crate::services::profile_service::DocumentUpload;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub doc_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_url: String,
    pub profile: Profile,
}

struct ReceivedFile {
    file_name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

/// Multipart form with a `file` part and a `docKey` text part (or query parameter).
pub async fn upload_document(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    let mut doc_key = query.doc_key;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "docKey" => doc_key = Some(field.text().await.map_err(multipart_error)?),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(ReceivedFile { file_name, content_type, bytes: bytes.to_vec() });
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::new(ErrorCode::DocumentMissing, "no file uploaded"))?;
    let doc_key = doc_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::DocumentKeyMissing, "docKey is required"))?;

    let (file_url, profile) = state
        .profiles
        .attach_document(
            user.id,
            DocumentUpload {
                doc_key,
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(UploadResponse { file_url, profile })))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(ErrorCode::PayloadTooLarge, "uploaded file is too large");
    }
    AppError::bad_request(format!("invalid multipart body: {}", e.body_text()))
}
