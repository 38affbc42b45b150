//! Depot Storage Engine
//!
//! This crate provides the transport-agnostic core of the depot file store: a
//! single directory tree of client files with best-effort visual previews.
//!
//! ## Design Principles
//!
//! - Every client path is normalized into the storage root; traversal
//!   sequences are discarded, never rejected
//! - The filesystem is the sole store of truth: items are views computed
//!   from `stat` at request time, with no database or index beside them
//! - Previews are a cache, not data: generation failures degrade the preview,
//!   never the upload
//! - Batch uploads run members concurrently and report the first failure;
//!   completed sibling writes stay on disk
//!
//! ## Storage Layout
//!
//! ```text
//! <storage_root>/
//! ├── <client folders and files…>
//! └── .previews/          # reserved, hidden from listings
//!     └── <sha-256 of absolute source path>.jpg
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use depot_engine::{EngineConfig, StorageEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new(
//!     "/depot_data".into(),
//!     ".previews".to_string(),
//!     320,
//!     "convert".to_string(),
//!     "ffmpeg".to_string(),
//! )?;
//! let engine = StorageEngine::new(Arc::new(config))?;
//!
//! let folder = engine.mkdir("/photos/cats").await?;
//! assert_eq!(folder.mime, "directory");
//! # Ok(())
//! # }
//! ```

pub mod classify;

mod config;
mod engine;
mod error;
mod item;
mod paths;
mod preview;

pub use config::{
    EngineConfig, DEFAULT_PREVIEW_DIR, DEFAULT_PREVIEW_WIDTH, DEFAULT_STORAGE_ROOT,
};
pub use engine::StorageEngine;
pub use error::{EngineError, EngineResult};
pub use item::{Item, Listing, UploadByPayloadRequest, UploadByUrlRequest};
pub use paths::{NormalizedPath, PathResolver};
pub use preview::{PreviewCache, PreviewResult};
