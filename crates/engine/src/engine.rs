//! Storage engine orchestration.
//!
//! [`StorageEngine`] ties the resolver, classifier and preview cache together
//! behind the six client-facing operations: directory creation, listing,
//! metadata lookup, deletion, and the two upload flows. The filesystem under
//! the storage root is the sole store of truth; the engine keeps no state
//! between requests beyond its startup configuration, so no cross-request
//! locking exists. Concurrent writers to the same target path race and the
//! last writer wins.

use crate::classify;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::item::{Item, Listing, UploadByPayloadRequest, UploadByUrlRequest};
use crate::paths::{NormalizedPath, PathResolver};
use crate::preview::PreviewCache;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::header::CONTENT_TYPE;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Upper bound on one remote fetch, connect to last byte. Remote servers are
/// untrusted; a hung fetch must not stall an upload slot forever.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates all storage operations under a single configured root.
///
/// # Design
///
/// - Root-contained: every path is normalized before filesystem access
/// - Stateless: items are views computed from stat, never persisted
/// - Best-effort previews: generation is attempted after each write but can
///   never fail the write
#[derive(Debug)]
pub struct StorageEngine {
    config: Arc<EngineConfig>,
    resolver: PathResolver,
    previews: PreviewCache,
    client: reqwest::Client,
}

impl StorageEngine {
    /// Creates a new `StorageEngine` from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HttpClient` if the outbound HTTP client cannot
    /// be constructed.
    pub fn new(config: Arc<EngineConfig>) -> EngineResult<Self> {
        let resolver = PathResolver::new(config.storage_root());
        let previews = PreviewCache::new(config.clone());
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(EngineError::HttpClient)?;

        Ok(Self {
            config,
            resolver,
            previews,
            client,
        })
    }

    /// Create a directory (and any missing parents) and return its metadata.
    ///
    /// Idempotent: creating a directory that already exists is not an error.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DirCreation` when the filesystem refuses the
    /// creation, or a metadata error from the follow-up lookup.
    pub async fn mkdir(&self, path: &str) -> EngineResult<Item> {
        let normalized = self.ensure_dir(path).await?;
        tracing::info!("created directory {}", normalized.local_path);
        self.info(&normalized.local_path)
    }

    /// Enumerate the immediate children of a directory, partitioned into
    /// folders and files.
    ///
    /// The reserved preview folder is excluded from results even when it is
    /// a physical child of the listed path. An absent or non-directory
    /// target lists as empty. Enumeration order is whatever the filesystem
    /// yields; no sorting is applied.
    pub fn list(&self, path: &str) -> EngineResult<Listing> {
        let normalized = self.resolver.normalize(path);
        let preview_dir = self.resolver.normalize(self.config.preview_dir());

        let entries = match std::fs::read_dir(&normalized.full_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::NotADirectory => {
                return Ok(Listing::default())
            }
            Err(e) => {
                return Err(EngineError::DirRead {
                    path: normalized.full_path,
                    source: e,
                })
            }
        };

        let mut listing = Listing::default();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::DirRead {
                path: normalized.full_path.clone(),
                source: e,
            })?;
            if entry.path() == preview_dir.full_path {
                continue;
            }

            let name = entry.file_name();
            let child_local = if normalized.local_path == "/" {
                format!("/{}", name.to_string_lossy())
            } else {
                format!("{}/{}", normalized.local_path, name.to_string_lossy())
            };

            let item = self.info(&child_local)?;
            if item.mime == classify::DIRECTORY_MIME {
                listing.folders.push(item);
            } else {
                listing.files.push(item);
            }
        }

        Ok(listing)
    }

    /// Metadata view of a single path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` when no entry exists behind the path.
    pub fn info(&self, path: &str) -> EngineResult<Item> {
        let normalized = self.resolver.normalize(path);

        let metadata = match std::fs::metadata(&normalized.full_path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EngineError::NotFound(normalized.local_path))
            }
            Err(e) => {
                return Err(EngineError::Stat {
                    path: normalized.full_path,
                    source: e,
                })
            }
        };

        let mime = classify::mime_for_path(&normalized.full_path, &metadata);
        let name = normalized
            .full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let thumbnail = (mime != classify::DIRECTORY_MIME)
            .then(|| self.previews.identity_for(&normalized.full_path).local_path);

        // Birth time is not available on every filesystem; fall back to the
        // modification time rather than failing the lookup.
        let modified = metadata.modified().map(epoch_millis).unwrap_or_default();
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(epoch_millis)
            .unwrap_or_default();

        Ok(Item {
            src: normalized.local_path.clone(),
            path: parent_of(&normalized.local_path),
            name,
            mime: mime.to_string(),
            size: metadata.len(),
            created,
            modified,
            thumbnail,
        })
    }

    /// Metadata views for a batch of paths, order preserved.
    ///
    /// # Errors
    ///
    /// The first path without an entry fails the whole call with
    /// `EngineError::NotFound`; per-entry misses are propagated, not
    /// swallowed.
    pub fn info_many(&self, paths: &[String]) -> EngineResult<Vec<Item>> {
        paths.iter().map(|p| self.info(p)).collect()
    }

    /// Recursively delete a target, directory or file.
    ///
    /// Force semantics: removing an already-absent target succeeds. When the
    /// target is a plain file its preview artifact is deleted too,
    /// best-effort; an absent preview is not an error.
    pub async fn remove(&self, path: &str) -> EngineResult<()> {
        let normalized = self.resolver.normalize(path);

        let metadata = match std::fs::metadata(&normalized.full_path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(EngineError::Stat {
                    path: normalized.full_path,
                    source: e,
                })
            }
        };

        if metadata.is_dir() {
            if let Err(e) = tokio::fs::remove_dir_all(&normalized.full_path).await {
                if e.kind() != ErrorKind::NotFound {
                    return Err(EngineError::Removal {
                        path: normalized.full_path,
                        source: e,
                    });
                }
            }
        } else {
            if let Err(e) = tokio::fs::remove_file(&normalized.full_path).await {
                if e.kind() != ErrorKind::NotFound {
                    return Err(EngineError::Removal {
                        path: normalized.full_path,
                        source: e,
                    });
                }
            }

            let preview = self.previews.identity_for(&normalized.full_path);
            if let Err(e) = tokio::fs::remove_file(&preview.full_path).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!("could not remove preview {}: {}", preview.local_path, e);
                }
            }
        }

        tracing::info!("removed {}", normalized.local_path);
        Ok(())
    }

    /// Upload a batch of remote resources.
    ///
    /// Members run concurrently; the call succeeds only if every member
    /// succeeds. On failure the first member error is reported and sibling
    /// writes that already completed stay on disk; there is no rollback.
    ///
    /// # Errors
    ///
    /// `EngineError::Fetch`/`FetchStatus` for unreachable URLs or
    /// non-success responses, plus any write pipeline error.
    pub async fn upload_by_url(&self, requests: Vec<UploadByUrlRequest>) -> EngineResult<Vec<Item>> {
        try_join_all(requests.iter().map(|r| self.upload_one_url(r))).await
    }

    /// Upload a batch of inline base64 payloads.
    ///
    /// Same batch contract as [`Self::upload_by_url`].
    ///
    /// # Errors
    ///
    /// `EngineError::PayloadDecode` for undecodable payloads, plus any write
    /// pipeline error.
    pub async fn upload_by_payload(
        &self,
        requests: Vec<UploadByPayloadRequest>,
    ) -> EngineResult<Vec<Item>> {
        try_join_all(requests.iter().map(|r| self.upload_one_payload(r))).await
    }

    async fn upload_one_url(&self, request: &UploadByUrlRequest) -> EngineResult<Item> {
        // Fetch before touching the filesystem: a failed fetch leaves no
        // side effects behind.
        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| EngineError::Fetch {
                url: request.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::FetchStatus {
                url: request.url.clone(),
                status,
            });
        }

        let response_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(classify::DEFAULT_MIME)
            .to_string();

        let bytes = response.bytes().await.map_err(|e| EngineError::Fetch {
            url: request.url.clone(),
            source: e,
        })?;

        let dir = self.ensure_dir(&request.path).await?;
        let file_name =
            classify::file_name_for_url(request.name.as_deref(), &request.url, &response_mime);

        self.write_file(&dir, &file_name, &bytes).await
    }

    async fn upload_one_payload(&self, request: &UploadByPayloadRequest) -> EngineResult<Item> {
        let dir = self.ensure_dir(&request.path).await?;
        let file_name = classify::file_name_for_payload(request.name.as_deref(), &request.base64);

        let bytes =
            STANDARD
                .decode(request.base64.as_bytes())
                .map_err(|e| EngineError::PayloadDecode {
                    name: file_name.clone(),
                    source: e,
                })?;

        self.write_file(&dir, &file_name, &bytes).await
    }

    /// Write pipeline shared by both upload flows.
    async fn write_file(
        &self,
        dir: &NormalizedPath,
        file_name: &str,
        bytes: &[u8],
    ) -> EngineResult<Item> {
        let target = self
            .resolver
            .normalize(&format!("{}/{}", dir.local_path, file_name));

        tokio::fs::write(&target.full_path, bytes)
            .await
            .map_err(|e| EngineError::FileWrite {
                path: target.full_path.clone(),
                source: e,
            })?;

        tracing::info!("wrote {} ({} bytes)", target.local_path, bytes.len());

        // Returned metadata must reflect an already-attempted preview, not a
        // pending one. The outcome itself is logged by the cache and never
        // fails the upload.
        let _ = self.previews.generate(&target).await;

        self.info(&target.local_path)
    }

    async fn ensure_dir(&self, path: &str) -> EngineResult<NormalizedPath> {
        let normalized = self.resolver.normalize(path);
        tokio::fs::create_dir_all(&normalized.full_path)
            .await
            .map_err(|e| EngineError::DirCreation {
                path: normalized.full_path.clone(),
                source: e,
            })?;
        Ok(normalized)
    }
}

fn parent_of(local_path: &str) -> String {
    match local_path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

fn epoch_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}
