//! Image upload handler

use crate::error::{ApiResult, AppError};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use crate::storage::{sanitize_file_name, StoredImage};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

/// Uploads above this size are refused
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Malformed upload: {}", e))
}

/// POST /api/upload-image
///
/// Multipart with a `file` part and a `fileName` part.
pub async fn upload_image(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SuccessResponse<StoredImage>>)> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((bytes.to_vec(), content_type));
            }
            Some("fileName") => {
                file_name = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let file = file.filter(|(bytes, _)| !bytes.is_empty());
    let file_name = file_name.filter(|n| !n.trim().is_empty());
    let (Some((bytes, content_type)), Some(file_name)) = (file, file_name) else {
        return Err(AppError::BadRequest("Missing file or filename".to_string()));
    };

    let name = sanitize_file_name(&file_name)?;
    let stored = state.storage.upload(&name, bytes, &content_type).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Image uploaded", stored)),
    ))
}
