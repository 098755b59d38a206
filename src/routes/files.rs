use std::path::{Component, Path};

use serde_json::json;

use crate::image::{self, UploadError};

use super::*;

pub async fn script(ReqPath(file_name): ReqPath<String>) -> Response {
    static_file(format!("static/scripts/{file_name}"), "text/javascript").await
}

pub async fn style(ReqPath(file_name): ReqPath<String>) -> Response {
    static_file(format!("static/styles/{file_name}"), "text/css").await
}

async fn static_file(path: String, content_type: &'static str) -> Response {
    let path = Path::new(&path);
    if !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read_to_string(path).await {
        Ok(content) => ([(header::CONTENT_TYPE, content_type)], content).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn upload_error(e: UploadError) -> Response {
    let status = match &e {
        UploadError::NotSignedIn => StatusCode::UNAUTHORIZED,
        UploadError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Empty | UploadError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        UploadError::Backend(e) => {
            tracing::error!("image storage failed: {e}");
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    folder: String,

    /// The original file name, used for the extension.
    #[serde(default)]
    name: String,
}

/// Store the request body as an image and answer with its URL and path.
pub async fn upload_image(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    let viewer = auth::get_viewer(&headers, &state);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|c| c.to_str().ok())
        .unwrap_or_default();

    let result = image::upload(
        state.backend.as_ref(),
        viewer.as_ref(),
        &query.folder,
        &query.name,
        content_type,
        body.to_vec(),
    )
    .await;

    match result {
        Ok(uploaded) => {
            tracing::info!("uploaded image {}", uploaded.path);
            Json(uploaded).into_response()
        }
        Err(e) => upload_error(e),
    }
}

#[derive(Deserialize)]
pub struct DeleteImage {
    url: String,
}

pub async fn delete_image(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<DeleteImage>,
) -> Response {
    let Some(viewer) = auth::get_viewer(&headers, &state) else {
        return upload_error(UploadError::NotSignedIn);
    };

    let bucket = &state.config.storage_bucket;
    match image::delete(state.backend.as_ref(), &viewer, bucket, &body.url).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => upload_error(e),
    }
}
