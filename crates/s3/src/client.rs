//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the BlobStore trait from bw-core.
//! Containers map to buckets and blob keys to object keys.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use bw_core::{BlobReader, BlobStore, Error, InstanceConfig, Result};

use crate::multipart::{self, MultipartConfig};

/// Error codes that mean the request was rejected for its credentials
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
];

/// Connection settings shared by registered and ephemeral clients
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Endpoint URL; the AWS default resolution applies when unset
    pub endpoint: Option<String>,

    /// Region
    pub region: String,

    /// Use path-style bucket addressing
    pub force_path_style: bool,
}

impl S3Settings {
    pub fn new(endpoint: Option<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint,
            region: region.into(),
            force_path_style: true,
        }
    }

    /// Settings for a configured instance
    pub fn from_instance(instance: &InstanceConfig) -> Self {
        Self {
            endpoint: instance.endpoint.clone(),
            region: instance.region.clone(),
            // Path style for compatibility unless DNS lookup is requested
            force_path_style: instance.bucket_lookup == "path"
                || instance.bucket_lookup == "auto",
        }
    }
}

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    multipart: MultipartConfig,
}

impl S3Client {
    /// Connect with static credentials
    pub async fn connect(settings: &S3Settings, identity: &str, secret: &str) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            identity,
            secret,
            None, // session token
            None, // expiry
            "bw-static-credentials",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(settings.region.clone()));
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(settings.force_path_style)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            multipart: MultipartConfig::default(),
        })
    }

    /// Connect using a configured instance
    pub async fn from_instance(instance: &InstanceConfig) -> Result<Self> {
        Self::connect(
            &S3Settings::from_instance(instance),
            &instance.identity,
            &instance.secret,
        )
        .await
    }

    /// Override the multipart settings
    pub fn with_multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    async fn put_file(&self, container: &str, key: &str, source: &Path) -> Result<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        self.inner
            .put_object()
            .bucket(container)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("multipart", &self.multipart)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlobStore for S3Client {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(container).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|se| se.is_not_found())
                    || e.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing { Ok(false) } else { Err(sdk_error(e)) }
            }
        }
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        match self.inner.create_bucket().bucket(container).send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => Err(sdk_error(e)),
        }
    }

    async fn blob_exists(&self, container: &str, key: &str) -> Result<bool> {
        match self
            .inner
            .head_object()
            .bucket(container)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|se| se.is_not_found())
                    || e.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing { Ok(false) } else { Err(sdk_error(e)) }
            }
        }
    }

    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader> {
        let response = self
            .inner
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    Error::BlobNotFound(format!("{container}/{key}"))
                } else {
                    sdk_error(e)
                }
            })?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    async fn commit_write(&self, container: &str, key: &str, source: &Path) -> Result<()> {
        let size = tokio::fs::metadata(source).await?.len();

        if size > self.multipart.part_size {
            multipart::upload_file(&self.inner, &self.multipart, container, key, source, size)
                .await
        } else {
            self.put_file(container, key, source).await
        }
    }
}

/// Map an SDK failure to a core error, keeping the full error chain
pub(crate) fn sdk_error<E: std::error::Error>(err: E) -> Error {
    classify(DisplayErrorContext(err).to_string())
}

fn classify(message: String) -> Error {
    if AUTH_ERROR_CODES.iter().any(|code| message.contains(code)) {
        Error::Auth(message)
    } else {
        Error::Network(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_errors() {
        let err = classify("service error: AccessDenied: Access Denied".to_string());
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(err.exit_code(), 4);

        let err = classify("InvalidAccessKeyId: no such key".to_string());
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_classify_other_errors_as_network() {
        let err = classify("dispatch failure: connection refused".to_string());
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_settings_from_instance() {
        let instance = InstanceConfig::new("inst1", "s3", "access", "secret")
            .with_endpoint("http://localhost:9000");
        let settings = S3Settings::from_instance(&instance);
        assert_eq!(settings.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(settings.region, "us-east-1");
        assert!(settings.force_path_style);

        let mut instance = instance;
        instance.bucket_lookup = "dns".to_string();
        assert!(!S3Settings::from_instance(&instance).force_path_style);
    }

    #[tokio::test]
    async fn test_connect_does_not_contact_endpoint() {
        let settings = S3Settings::new(Some("http://127.0.0.1:1".to_string()), "us-east-1");
        let client = S3Client::connect(&settings, "access", "secret")
            .await
            .unwrap();
        assert_eq!(
            client.inner().config().region().map(|r| r.as_ref()),
            Some("us-east-1")
        );
    }
}
