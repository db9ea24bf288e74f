//! # shop-blob: image hosting for the shop admin API
//!
//! `shop-blob` owns everything between an uploaded file and the remote image
//! host:
//!
//! - **Hosting**: the [`ImageHost`] seam, with an S3-compatible backend and an
//!   in-memory one for development and tests
//! - **Staging**: uploaded URLs wait in a per-session slot until the next
//!   create consumes them
//! - **Resolution**: stored URLs map back to remote object ids by an
//!   explicitly chosen [`ObjectIdStrategy`]
//! - **Release**: deleting an entity's images yields one result per image
//!   instead of failing as a whole
//!
//! ```text
//! ┌─────────────────┐
//! │   Your Service  │  ← business logic only
//! ├─────────────────┤
//! │  ImageAdapter   │  ← staging, resolution, release
//! ├─────────────────┤
//! │   ImageHost     │  ← upload / destroy primitives
//! └─────────────────┘
//! ```
//!
//! ```rust
//! use std::sync::Arc;
//! use shop_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let host = Arc::new(MemoryImageHost::new("http://localhost:3030/media"));
//! let images = ImageAdapter::new(host, ImageConfig::default());
//!
//! let key = StagingKey::new("acme", "session-1");
//! let target = UploadTarget::new("categories", Arc::new(FlatKeyStrategy));
//! let file = ImageFile::new(vec![1u8, 2, 3]).with_content_type("image/png");
//!
//! let urls = images.stage_upload_batch(&key, &target, vec![file]).await?;
//! assert_eq!(images.consume_staged_images(&key), urls);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod config;
mod error;
mod memory_store;
pub mod resolver;
mod s3_store;
pub mod staging;
pub mod store;
mod types;

pub use adapter::{ImageAdapter, UploadBatchLog, UploadTarget};
pub use config::ImageConfig;
pub use error::{BlobError, BlobResult};
pub use memory_store::MemoryImageHost;
pub use resolver::{resolve_object_id, ObjectIdStrategy};
pub use s3_store::{S3HostConfig, S3ImageHost};
pub use staging::UploadStaging;
pub use store::{
    DestroyResult, FlatKeyStrategy, HostedImage, ImageHost, ImageKeyStrategy, NestedKeyStrategy,
};
pub use types::{
    ImageFile, ImageRelease, ReleaseOutcome, RemoteDeletion, StagedImage, StagingKey,
    UploadBatchRecord,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobResult, FlatKeyStrategy, ImageAdapter, ImageConfig, ImageFile, ImageHost,
        MemoryImageHost, NestedKeyStrategy, ObjectIdStrategy, StagingKey, UploadTarget,
    };
}
