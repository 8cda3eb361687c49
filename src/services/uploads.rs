//! Image storage for book covers and author portraits

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult, ErrorCode},
};

/// URL prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Accepted image types and the extension they are stored under
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// An image received from a multipart form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct UploadService {
    directory: PathBuf,
    max_file_size: usize,
}

impl UploadService {
    pub fn new(config: UploadsConfig) -> Self {
        Self {
            directory: config.directory,
            max_file_size: config.max_file_size,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Create the upload directory if missing
    pub async fn ensure_directory(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    /// Store an image and return its public URL
    pub async fn store_image(&self, upload: ImageUpload) -> AppResult<String> {
        let Some(extension) = extension(&upload) else {
            return Err(AppError::Validation {
                code: ErrorCode::InvalidFileType,
                message: "The file type is not supported. Please upload a PNG, JPEG, GIF or WebP image."
                    .to_string(),
            });
        };

        if upload.bytes.len() > self.max_file_size {
            return Err(AppError::Validation {
                code: ErrorCode::FileTooLarge,
                message: format!("Images are limited to {} bytes", self.max_file_size),
            });
        }

        if upload.bytes.is_empty() {
            return Err(AppError::validation("The uploaded file is empty"));
        }

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        self.ensure_directory().await?;
        tokio::fs::write(self.directory.join(&name), &upload.bytes).await?;

        tracing::info!(
            original = upload.file_name.as_deref().unwrap_or("-"),
            "Stored upload {} ({} bytes)",
            name,
            upload.bytes.len()
        );
        Ok(format!("{}{}", PUBLIC_PREFIX, name))
    }

    /// Remove a previously stored file. Failures are logged, never returned.
    pub async fn delete(&self, url: &str) {
        let Some(path) = self.resolve(url) else {
            tracing::warn!("Refusing to delete file outside upload directory: {}", url);
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!("Deleted upload {}", url),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Upload {} already gone", url)
            }
            Err(e) => tracing::warn!("Failed to delete upload {}: {}", url, e),
        }
    }

    /// Map a public URL back to a file inside the upload directory
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(PUBLIC_PREFIX)?;
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !name.contains("..");
        valid.then(|| self.directory.join(name))
    }
}

/// Stored extension for a raster image type; `None` for anything else.
/// The extension always follows the content type so files are served back as images.
fn extension(upload: &ImageUpload) -> Option<&'static str> {
    let content_type = upload.content_type.as_deref()?;
    let essence = content_type.split(';').next().unwrap_or(content_type).trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}
