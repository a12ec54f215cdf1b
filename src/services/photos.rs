use async_trait::async_trait;

use crate::core::ports::{PhotoLinker, StoreError};

/// Resolves stored photo keys to public CDN links
#[derive(Debug, Clone)]
pub struct CdnPhotoLinker {
    base_url: String,
}

impl CdnPhotoLinker {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

#[async_trait]
impl PhotoLinker for CdnPhotoLinker {
    async fn profile_photo_link(&self, photo_key: &str) -> Result<String, StoreError> {
        if photo_key.is_empty() {
            return Err(StoreError::Malformed("empty photo key".to_string()));
        }

        Ok(format!("{}/{}", self.base_url, urlencoding::encode(photo_key)))
    }
}
