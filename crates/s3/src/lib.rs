//! bw-s3: S3 backend for blobwire
//!
//! This crate provides the implementation of the BlobStore and BackendFactory
//! traits using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
pub mod factory;
pub mod multipart;

pub use client::{S3Client, S3Settings};
pub use factory::{S3Factory, S3_SELECTORS};
pub use multipart::MultipartConfig;
