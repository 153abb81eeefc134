mod cache;
mod vision;

pub use cache::CachedRecognizer;
pub use vision::GoogleVisionRecognizer;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::error::ExtractError;

/// File extensions accepted from the upload path
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Anything that can turn image bytes into text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Get the recognizer name (e.g., "google_vision")
    fn name(&self) -> &str;

    /// Extract the full text of an image.
    ///
    /// Returns `Ok(None)` when the service found no text at all.
    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ExtractError>;
}

#[async_trait]
impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ExtractError> {
        (**self).recognize(image).await
    }
}

/// Where an image payload comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An uploaded image file
    Path(PathBuf),
    /// Bytes handed over directly, e.g. a camera capture piped on stdin
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Read the raw image payload
    ///
    /// Files must carry a JPEG or PNG extension. The contents are not
    /// inspected; the OCR service decides whether it can decode them.
    pub async fn load(self) -> Result<Vec<u8>, ExtractError> {
        match self {
            ImageSource::Path(path) => {
                check_extension(&path)?;
                Ok(tokio::fs::read(&path).await?)
            }
            ImageSource::Bytes(bytes) => Ok(bytes),
        }
    }

    /// Read a captured image from standard input
    pub async fn from_stdin() -> Result<Self, ExtractError> {
        let mut bytes = Vec::new();
        tokio::io::stdin().read_to_end(&mut bytes).await?;
        if bytes.is_empty() {
            return Err(ExtractError::UnsupportedImage(
                "no image data on standard input".to_string(),
            ));
        }
        Ok(ImageSource::Bytes(bytes))
    }

    /// Short label for log lines
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::Bytes(b) => format!("<{} captured bytes>", b.len()),
        }
    }
}

fn check_extension(path: &Path) -> Result<(), ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ExtractError::UnsupportedImage(format!(
            "{} (expected one of: {})",
            path.display(),
            ACCEPTED_EXTENSIONS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("label.jpg")).is_ok());
        assert!(check_extension(Path::new("label.JPEG")).is_ok());
        assert!(check_extension(Path::new("dir/label.png")).is_ok());
        assert!(check_extension(Path::new("label.gif")).is_err());
        assert!(check_extension(Path::new("label")).is_err());
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let bytes = ImageSource::Path(path).load().await.unwrap();
        assert_eq!(bytes, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_extension() {
        let result = ImageSource::Path(PathBuf::from("notes.txt")).load().await;
        assert!(matches!(result, Err(ExtractError::UnsupportedImage(_))));
    }

    #[tokio::test]
    async fn test_load_bytes_passthrough() {
        let bytes = ImageSource::Bytes(vec![1, 2, 3]).load().await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
