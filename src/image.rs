use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::backend::{Backend, BackendError};
use crate::data::Viewer;

/// Largest accepted upload, 50 MiB.
pub const MAX_IMAGE_BYTES: usize = 52_428_800;

/// Folder inside the bucket used when the caller does not name one.
pub const DEFAULT_FOLDER: &str = "blog-images";

const ALLOWED_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("sign in to upload images")]
    NotSignedIn,

    #[error("{0} is not a supported image type")]
    UnsupportedType(String),

    #[error("image is {0} bytes, the limit is {MAX_IMAGE_BYTES}")]
    TooLarge(usize),

    #[error("image is empty")]
    Empty,

    #[error("{0} is not an uploaded image URL")]
    InvalidUrl(String),

    #[error("storage failed: {0}")]
    Backend(#[from] BackendError),
}

/// A stored image.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Uploaded {
    pub url: String,
    pub path: String,
}

/// Check the type and size of an upload before anything is sent.
pub fn validate(content_type: &str, size: usize) -> Result<(), UploadError> {
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(UploadError::UnsupportedType(content_type.to_owned()));
    }
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge(size));
    }
    Ok(())
}

/// The extension for a stored file: from the original name, else from the type.
fn extension(file_name: &str, content_type: &str) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| match content_type {
        "image/jpeg" => "jpg".to_owned(),
        "image/svg+xml" => "svg".to_owned(),
        other => other.trim_start_matches("image/").to_owned(),
    })
}

/// A fresh, collision-resistant storage path: `<folder>/<random>-<millis>.<ext>`.
pub fn storage_path(folder: &str, file_name: &str, content_type: &str) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(11)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    let folder = folder.trim_matches('/');
    let folder = if folder.is_empty() { DEFAULT_FOLDER } else { folder };

    format!(
        "{folder}/{random}-{}.{}",
        Utc::now().timestamp_millis(),
        extension(file_name, content_type)
    )
}

/// The storage path of an image from its public URL.
pub fn path_from_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("/public/{bucket}/");
    let (_, path) = url.split_once(&marker)?;
    let path = path.split(['?', '#']).next().unwrap_or(path);
    (!path.is_empty()).then(|| path.to_owned())
}

/// Validate and store an image for the viewer.
pub async fn upload(
    backend: &dyn Backend,
    viewer: Option<&Viewer>,
    folder: &str,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<Uploaded, UploadError> {
    let viewer = viewer.ok_or(UploadError::NotSignedIn)?;
    validate(content_type, bytes.len())?;

    let path = storage_path(folder, file_name, content_type);
    backend
        .upload_image(viewer, &path, content_type, bytes)
        .await?;

    Ok(Uploaded {
        url: backend.image_url(&path),
        path,
    })
}

/// Delete an image given its public URL.
pub async fn delete(
    backend: &dyn Backend,
    viewer: &Viewer,
    bucket: &str,
    url: &str,
) -> Result<(), UploadError> {
    let path = path_from_url(url, bucket).ok_or_else(|| UploadError::InvalidUrl(url.to_owned()))?;
    backend.remove_image(viewer, &path).await?;
    tracing::info!("removed image {path}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::data::Role;

    #[test]
    fn only_supported_images_within_the_limit_pass() {
        assert!(validate("image/png", 10).is_ok());
        assert!(validate("image/svg+xml", MAX_IMAGE_BYTES).is_ok());
        assert!(matches!(
            validate("application/pdf", 10),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            validate("image/jpeg", MAX_IMAGE_BYTES + 1),
            Err(UploadError::TooLarge(_))
        ));
        assert!(matches!(validate("image/gif", 0), Err(UploadError::Empty)));
    }

    #[test]
    fn storage_paths_keep_the_extension() {
        let path = storage_path("", "Holiday.PNG", "image/png");
        let pattern = Regex::new(r"^blog-images/[a-z0-9]{11}-\d+\.png$").unwrap();
        assert!(pattern.is_match(&path), "{path}");

        assert!(storage_path("covers/", "blob", "image/jpeg").ends_with(".jpg"));
        assert!(storage_path("covers", "blob", "image/svg+xml").starts_with("covers/"));
    }

    #[test]
    fn paths_are_recovered_from_public_urls() {
        let url = "https://x.supabase.co/storage/v1/object/public/images/blog-images/a-1.png?t=1";
        assert_eq!(
            path_from_url(url, "images").as_deref(),
            Some("blog-images/a-1.png")
        );
        assert_eq!(path_from_url("https://example.com/a.png", "images"), None);
    }

    #[tokio::test]
    async fn uploads_need_a_viewer() {
        let backend = MemoryBackend::new();
        let result = upload(&backend, None, "", "a.png", "image/png", vec![1]).await;
        assert!(matches!(result, Err(UploadError::NotSignedIn)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn uploaded_images_can_be_deleted_by_url() {
        let backend = MemoryBackend::new();
        let viewer = backend.add_account("ada@example.com", "pw", "ada", Role::Editor);

        let uploaded = upload(&backend, Some(&viewer), "", "a.webp", "image/webp", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(backend.image(&uploaded.path), Some(vec![1, 2, 3]));
        assert!(uploaded.url.ends_with(&uploaded.path));

        delete(&backend, &viewer, "images", &uploaded.url).await.unwrap();
        assert_eq!(backend.image(&uploaded.path), None);
    }
}
