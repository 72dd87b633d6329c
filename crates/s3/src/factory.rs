//! Ephemeral S3 clients built from inline URL credentials

use std::sync::Arc;

use async_trait::async_trait;

use bw_core::{BackendFactory, BackendHandle, Error, Result};

use crate::client::{S3Client, S3Settings};

/// Selectors served by the S3 backend
pub const S3_SELECTORS: &[&str] = &["s3", "aws-s3"];

/// Builds a new, unregistered S3 client per call
#[derive(Debug, Clone)]
pub struct S3Factory {
    settings: S3Settings,
}

impl S3Factory {
    pub fn new(settings: S3Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BackendFactory for S3Factory {
    async fn create_backend(
        &self,
        selector: &str,
        identity: &str,
        secret: &str,
    ) -> Result<BackendHandle> {
        if !S3_SELECTORS.contains(&selector) {
            return Err(Error::BackendUnavailable(format!(
                "S3 factory cannot build '{selector}' backends"
            )));
        }

        tracing::debug!(selector, "Creating ephemeral S3 client");
        let client = S3Client::connect(&self.settings, identity, secret).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_foreign_selector() {
        let factory = S3Factory::new(S3Settings::new(None, "us-east-1"));
        let err = match factory.create_backend("azure", "id", "secret").await {
            Ok(_) => panic!("expected BackendUnavailable"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_each_call_builds_a_new_client() {
        let factory = S3Factory::new(S3Settings::new(
            Some("http://127.0.0.1:1".to_string()),
            "us-east-1",
        ));
        let a = factory.create_backend("s3", "id", "secret").await.unwrap();
        let b = factory.create_backend("aws-s3", "id", "secret").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
