//! Multipart upload support
//!
//! Staged files above the part size are committed part by part straight from
//! the staging file. A failure in any step, completion included, aborts the
//! upload so no orphaned parts remain.

use std::path::Path;

use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};

use bw_core::{Error, Result};

use crate::client::sdk_error;

/// Default part size: 64 MiB
pub const DEFAULT_PART_SIZE: u64 = 64 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Multipart upload configuration
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Part size in bytes; also the threshold above which multipart is used
    pub part_size: u64,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    /// Calculate appropriate part size for a file
    pub fn calculate_part_size(&self, file_size: u64) -> u64 {
        if file_size <= MIN_PART_SIZE {
            return MIN_PART_SIZE;
        }

        let parts = file_size.div_ceil(self.part_size);

        if parts <= MAX_PARTS as u64 {
            self.part_size
        } else {
            // Need larger parts to fit within 10,000 limit
            let required_size = file_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> usize {
    file_size.div_ceil(part_size) as usize
}

/// Get byte range for a part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

/// Upload `source` as `container/key` in parts
pub(crate) async fn upload_file(
    client: &aws_sdk_s3::Client,
    config: &MultipartConfig,
    container: &str,
    key: &str,
    source: &Path,
    size: u64,
) -> Result<()> {
    let created = client
        .create_multipart_upload()
        .bucket(container)
        .key(key)
        .send()
        .await
        .map_err(sdk_error)?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| Error::General("Multipart upload returned no upload id".into()))?
        .to_string();

    let part_size = config.calculate_part_size(size);
    tracing::debug!(
        blob = %format!("{container}/{key}"),
        parts = calculate_parts(size, part_size),
        part_size,
        "Starting multipart upload"
    );

    let upload = async {
        let parts =
            upload_parts(client, container, key, &upload_id, source, part_size, size).await?;
        client
            .complete_multipart_upload()
            .bucket(container)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(sdk_error)?;
        Ok::<_, Error>(())
    };
    let abort = async {
        client
            .abort_multipart_upload()
            .bucket(container)
            .key(key)
            .upload_id(&upload_id)
            .send()
            .await
            .map(|_| ())
            .map_err(sdk_error)
    };

    abort_on_failure(&upload_id, upload, abort).await
}

/// Run `upload`; if any step of it fails, run `abort` before returning the error
async fn abort_on_failure<U, A>(upload_id: &str, upload: U, abort: A) -> Result<()>
where
    U: Future<Output = Result<()>>,
    A: Future<Output = Result<()>>,
{
    let Err(e) = upload.await else {
        return Ok(());
    };
    if let Err(abort_err) = abort.await {
        tracing::warn!(
            upload_id,
            error = %abort_err,
            "Failed to abort multipart upload"
        );
    }
    Err(e)
}

async fn upload_parts(
    client: &aws_sdk_s3::Client,
    container: &str,
    key: &str,
    upload_id: &str,
    source: &Path,
    part_size: u64,
    size: u64,
) -> Result<Vec<CompletedPart>> {
    let total = calculate_parts(size, part_size);
    let mut completed = Vec::with_capacity(total);

    for index in 0..total {
        let part_number = index as i32 + 1;
        let (start, end) = part_byte_range(part_number, part_size, size);

        let body = ByteStream::read_from()
            .path(source)
            .offset(start)
            .length(Length::Exact(end - start))
            .build()
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        let response = client
            .upload_part()
            .bucket(container)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(body)
            .send()
            .await
            .map_err(sdk_error)?;

        completed.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(response.e_tag().map(str::to_string))
                .build(),
        );
    }

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_completion_aborts_upload() {
        let aborted = std::sync::atomic::AtomicBool::new(false);
        let result = abort_on_failure(
            "upload-1",
            async {
                // Parts uploaded; completion rejected.
                Err(Error::Network("InternalError on CompleteMultipartUpload".into()))
            },
            async {
                aborted.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert!(aborted.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_abort_keeps_original_error() {
        let result = abort_on_failure(
            "upload-2",
            async { Err(Error::Auth("AccessDenied".into())) },
            async { Err(Error::Network("connection reset".into())) },
        )
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_successful_upload_is_not_aborted() {
        let aborted = std::sync::atomic::AtomicBool::new(false);
        abort_on_failure("upload-3", async { Ok(()) }, async {
            aborted.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert!(!aborted.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_default_config() {
        let config = MultipartConfig::default();
        assert_eq!(config.part_size, DEFAULT_PART_SIZE);
    }

    #[test]
    fn test_part_size_clamping() {
        let config = MultipartConfig::new().part_size(1024);
        assert_eq!(config.part_size, MIN_PART_SIZE);

        let config = MultipartConfig::new().part_size(10 * 1024 * 1024 * 1024);
        assert_eq!(config.part_size, MAX_PART_SIZE);
    }

    #[test]
    fn test_calculate_part_size_small_file() {
        let config = MultipartConfig::default();
        assert_eq!(config.calculate_part_size(1024 * 1024), MIN_PART_SIZE);
    }

    #[test]
    fn test_calculate_part_size_large_file() {
        let config = MultipartConfig::default();
        // Would need more than 10,000 parts at the default size
        let huge_file = DEFAULT_PART_SIZE * 20_000;
        let size = config.calculate_part_size(huge_file);
        assert!(calculate_parts(huge_file, size) <= MAX_PARTS);
    }

    #[test]
    fn test_part_byte_ranges_cover_file() {
        assert_eq!(part_byte_range(1, 100, 250), (0, 100));
        assert_eq!(part_byte_range(2, 100, 250), (100, 200));
        assert_eq!(part_byte_range(3, 100, 250), (200, 250));
        assert_eq!(calculate_parts(250, 100), 3);
        assert_eq!(calculate_parts(200, 100), 2);
    }
}
