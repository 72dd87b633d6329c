//! bw-core: Core library for blobwire
//!
//! This crate provides stream access to object storage through `blob://` URLs:
//! - Address parsing (`blob://provider/container/key?id=instance`)
//! - Backend resolution through injected lookup and factory capabilities
//! - Pass-through reads
//! - Staged writes committed asynchronously, with guaranteed cleanup
//! - Configuration and instance management
//!
//! This crate is independent of any specific storage SDK; `bw-s3` provides
//! the S3 backend and the in-memory `transient` backend lives here.

pub mod address;
pub mod backend;
pub mod config;
pub mod error;
pub mod instance;
pub mod memory;
pub mod protocol;
pub mod read;
pub mod registry;
pub mod resolver;
pub mod staging;
pub mod write;

pub use address::{BlobAddress, InlineCredentials, UserInfo, parse_address};
pub use backend::{
    BackendFactory, BackendHandle, BackendLookup, BlobReader, BlobStore, FactoryRegistry,
};
pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use instance::{InstanceConfig, InstanceManager};
pub use memory::{MemoryFactory, MemoryStore, TRANSIENT_SELECTOR};
pub use protocol::BlobProtocol;
pub use registry::InstanceRegistry;
pub use resolver::{ResolvedBackend, resolve};
pub use staging::StagingFile;
pub use write::{BlobWriter, CommitOutcome, CommitPolicy, CommitStats, Committer};
