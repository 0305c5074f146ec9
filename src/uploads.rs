//! Durable storage for payment screenshots.

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::domain::value_objects::OrderNumber;
use crate::EcommerceError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Payment screenshot is required")]
    Missing,

    #[error("Only JPEG, PNG and WebP images are accepted")]
    UnsupportedType,

    #[error("Payment screenshot must be {} KB or smaller", .limit / 1024)]
    TooLarge { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for EcommerceError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Io(io) => EcommerceError::Storage(format!("screenshot storage failed: {io}")),
            other => EcommerceError::Validation(other.to_string()),
        }
    }
}

/// Accepted screenshot formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind { Jpeg, Png, Webp }

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Checks the leading magic bytes against the declared type.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Self::Webp => bytes.len() >= 12 && bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self { Self::Jpeg => "jpg", Self::Png => "png", Self::Webp => "webp" }
    }
}

/// An image received from a client, not yet stored.
#[derive(Clone, Debug)]
pub struct UploadedImage {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn validate(content_type: Option<&str>, bytes: Vec<u8>, max_bytes: usize) -> Result<Self, UploadError> {
        if bytes.is_empty() { return Err(UploadError::Missing); }
        let kind = content_type.and_then(ImageKind::from_content_type).ok_or(UploadError::UnsupportedType)?;
        if bytes.len() > max_bytes { return Err(UploadError::TooLarge { limit: max_bytes }); }
        if !kind.matches(&bytes) { return Err(UploadError::UnsupportedType); }
        Ok(Self { kind, bytes })
    }
}

#[derive(Clone, Debug)]
pub struct ScreenshotStorage {
    root: PathBuf,
}

impl ScreenshotStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    /// Writes the image and returns its storage reference (a file name under the root).
    pub async fn save(&self, order_number: &OrderNumber, image: &UploadedImage) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let reference = format!("{}-{}.{}", order_number, Uuid::new_v4().simple(), image.kind.extension());
        let path = self.root.join(&reference);
        if let Err(e) = tokio::fs::write(&path, &image.bytes).await {
            // a partial write must not outlive the failed request
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial screenshot {}: {cleanup}", path.display());
                }
            }
            return Err(e.into());
        }
        Ok(reference)
    }

    /// Removes a stored screenshot; an already-missing file is not an error.
    pub async fn remove(&self, reference: &str) -> Result<(), UploadError> {
        match tokio::fs::remove_file(self.path_of(reference)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn path_of(&self, reference: &str) -> PathBuf {
        // file name only
        let name = std::path::Path::new(reference).file_name().map(PathBuf::from).unwrap_or_default();
        self.root.join(name)
    }
}
