//! Video upload and retrieval handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{error, info};

use vidpipe_metadata::MetadataError;
use vidpipe_models::{VideoId, VideoRecord, VideoResponse};
use vidpipe_queue::VideoUploadedMessage;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upload response body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub video_id: String,
}

/// Upload a video: blob put, intake record, queue message.
///
/// Expects a multipart form with a `file` field. The object key embeds
/// the generated video id so concurrent uploads of same-named files
/// never collide.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let original_filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::bad_request("Missing filename"))?;
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
            upload = Some((original_filename, content_type, data));
            break;
        }
    }

    let (original_filename, content_type, data) =
        upload.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;
    if data.is_empty() {
        return Err(ApiError::bad_request("Empty file upload"));
    }

    let video_id = VideoId::new();
    let key = format!("{}-{}", video_id, original_filename);

    info!(video_id = %video_id, key = %key, size = data.len(), "Uploading video");

    let url = state
        .storage
        .upload_bytes(data.to_vec(), &key, &content_type)
        .await?;

    let record = VideoRecord::new_uploaded(video_id.clone(), &original_filename, url);
    state.metadata.put_video(&record).await?;

    let message = VideoUploadedMessage::new(video_id.as_str(), &key).with_event_type("video_uploaded");
    if let Err(e) = state.queue.enqueue(&message).await {
        // The record exists but no worker will pick it up; surface this
        // as a server error so the client can retry the upload.
        error!(video_id = %video_id, "Failed to enqueue processing message: {}", e);
        return Err(e.into());
    }

    metrics::record_video_uploaded();
    info!(video_id = %video_id, "Video uploaded and enqueued for processing");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            video_id: video_id.to_string(),
        }),
    ))
}

/// Fetch a video record by id.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let video_id = VideoId::from_string(video_id);
    if !video_id.is_valid() {
        return Err(ApiError::bad_request("Invalid video ID"));
    }

    match state.metadata.get_video(&video_id).await {
        Ok(record) => Ok(Json(VideoResponse::from(&record))),
        Err(MetadataError::NotFound(_)) => {
            Err(ApiError::not_found(format!("Video not found: {}", video_id)))
        }
        Err(e) => Err(e.into()),
    }
}
