use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::TextRecognizer;
use crate::error::ExtractError;

/// Memoizes OCR results by exact image content.
///
/// OCR of a fixed image is deterministic, so identical bytes are only sent
/// once per process. Failed calls are not remembered and will be retried on
/// the next submission. The cache is unbounded.
pub struct CachedRecognizer<R> {
    inner: R,
    entries: Mutex<HashMap<Vec<u8>, Option<String>>>,
}

impl<R: TextRecognizer> CachedRecognizer<R> {
    pub fn new(inner: R) -> Self {
        CachedRecognizer {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct images remembered
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Vec<u8>, Option<String>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<R: TextRecognizer> TextRecognizer for CachedRecognizer<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ExtractError> {
        let cached = self.lock().get(image).cloned();
        if let Some(hit) = cached {
            debug!("OCR cache hit ({} bytes)", image.len());
            return Ok(hit);
        }

        let result = self.inner.recognize(image).await?;
        self.lock().insert(image.to_vec(), result.clone());
        Ok(result)
    }
}
