//! Read path
//!
//! Returns the backend's own stream; nothing is buffered or staged here.

use crate::address::BlobAddress;
use crate::backend::{BlobReader, BlobStore};
use crate::error::{Error, Result};

/// Open a streaming read of the addressed blob
pub async fn open_read(handle: &dyn BlobStore, address: &BlobAddress) -> Result<BlobReader> {
    if !handle.container_exists(&address.container).await? {
        return Err(Error::ContainerNotFound(address.container.clone()));
    }
    if !handle.blob_exists(&address.container, &address.key).await? {
        return Err(Error::BlobNotFound(address.object_path()));
    }

    tracing::debug!(address = %address, "Opening blob read stream");
    handle.open_read(&address.container, &address.key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBlobStore;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_missing_container() {
        let mut store = MockBlobStore::new();
        store.expect_container_exists().returning(|_| Ok(false));
        store.expect_blob_exists().never();
        store.expect_open_read().never();
        store.expect_create_container().never();

        let address = BlobAddress::new("s3", "nope", "key");
        let err = match open_read(&store, &address).await {
            Ok(_) => panic!("expected ContainerNotFound"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::ContainerNotFound(ref c) if c == "nope"));
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let mut store = MockBlobStore::new();
        store.expect_container_exists().returning(|_| Ok(true));
        store.expect_blob_exists().returning(|_, _| Ok(false));
        store.expect_open_read().never();

        let address = BlobAddress::new("s3", "bucket", "reports/q1.csv");
        let err = match open_read(&store, &address).await {
            Ok(_) => panic!("expected BlobNotFound"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::BlobNotFound(ref p) if p == "bucket/reports/q1.csv"));
    }

    #[tokio::test]
    async fn test_passes_backend_stream_through() {
        let mut store = MockBlobStore::new();
        store.expect_container_exists().returning(|_| Ok(true));
        store.expect_blob_exists().returning(|_, _| Ok(true));
        store
            .expect_open_read()
            .withf(|container, key| container == "bucket" && key == "a/b")
            .times(1)
            .returning(|_, _| Ok(Box::pin(std::io::Cursor::new(b"payload".to_vec())) as BlobReader));

        let address = BlobAddress::new("s3", "bucket", "a/b");
        let mut reader = open_read(&store, &address).await.unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "payload");
    }

    #[tokio::test]
    async fn test_backend_error_is_not_masked() {
        let mut store = MockBlobStore::new();
        store
            .expect_container_exists()
            .returning(|_| Err(Error::Network("connection reset".into())));

        let address = BlobAddress::new("s3", "bucket", "k");
        let err = match open_read(&store, &address).await {
            Ok(_) => panic!("expected a network error"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::Network(_)));
    }
}
