//! Best-effort preview generation and the preview cache layout.
//!
//! Every stored file has exactly one potential preview, addressed by a
//! deterministic hash of its absolute path and kept in a single reserved
//! folder under the storage root. Generation shells out to external
//! converters (ImageMagick for stills and documents, ffmpeg for videos) and
//! swallows every failure: a missing preview is an acceptable, distinguishable
//! end state, never a reason to fail the upload that triggered it.

use crate::classify;
use crate::config::EngineConfig;
use crate::paths::{NormalizedPath, PathResolver};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Extension of every generated preview artifact.
const PREVIEW_EXT: &str = "jpg";

/// Rasterization density for document previews.
const PDF_DENSITY: &str = "150";

/// Timestamp (seconds) of the frame extracted for video previews.
const VIDEO_FRAME_AT: &str = "1";

/// Upper bound on a single converter invocation. The converters are black
/// boxes; a hung process must not stall the upload pipeline forever.
const CONVERT_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of one preview generation attempt.
///
/// Kept internal to the engine for observability; callers of engine
/// operations only ever observe "operation completed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResult {
    /// A converter ran to completion; the preview lives at this location.
    Generated(NormalizedPath),

    /// No preview was produced, with the reason why.
    Skipped(String),
}

/// Derives preview identities and drives the converter backends.
#[derive(Debug)]
pub struct PreviewCache {
    config: Arc<EngineConfig>,
    resolver: PathResolver,
}

impl PreviewCache {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let resolver = PathResolver::new(config.storage_root());
        Self { config, resolver }
    }

    /// Deterministic preview location for a stored file.
    ///
    /// The identity is the hex-encoded SHA-256 of the absolute path string,
    /// plus the fixed preview extension, under the reserved preview folder.
    /// Same path in, same location out; distinct paths collide with
    /// negligible probability.
    #[must_use]
    pub fn identity_for(&self, full_path: &Path) -> NormalizedPath {
        let mut hasher = Sha256::new();
        hasher.update(full_path.to_string_lossy().as_bytes());
        let digest = hex::encode(hasher.finalize());

        self.resolver.normalize(&format!(
            "{}/{}.{}",
            self.config.preview_dir(),
            digest,
            PREVIEW_EXT
        ))
    }

    /// Attempt to generate a preview for a freshly written file.
    ///
    /// Ensures the reserved folder exists, classifies the source, and
    /// dispatches to at most one backend. Every failure (unsupported type,
    /// unreadable source, missing converter, non-zero exit, timeout) maps
    /// to [`PreviewResult::Skipped`] with a reason. Never fails the caller.
    pub async fn generate(&self, source: &NormalizedPath) -> PreviewResult {
        // The reserved folder materializes on first attempt, whether or
        // not a backend ends up running for this source.
        let preview_dir = self.resolver.normalize(self.config.preview_dir());
        if let Err(e) = tokio::fs::create_dir_all(&preview_dir.full_path).await {
            return self.skip(source, format!("preview directory unavailable: {e}"));
        }

        let metadata = match std::fs::metadata(&source.full_path) {
            Ok(m) => m,
            Err(e) => return self.skip(source, format!("source unreadable: {e}")),
        };
        let mime = classify::mime_for_path(&source.full_path, &metadata);

        let supported = classify::is_image_mime(mime)
            || classify::is_pdf_mime(mime)
            || classify::is_video_mime(mime);
        if !supported {
            return self.skip(source, format!("no preview backend for {mime}"));
        }

        let target = self.identity_for(&source.full_path);
        let width = self.config.preview_width().to_string();

        let (label, command) = if classify::is_video_mime(mime) {
            let mut command = Command::new(self.config.ffmpeg_bin());
            command
                .arg("-y")
                .arg("-ss")
                .arg(VIDEO_FRAME_AT)
                .arg("-i")
                .arg(&source.full_path)
                .arg("-frames:v")
                .arg("1")
                .arg("-vf")
                .arg(format!("scale={width}:-1"))
                .arg(&target.full_path);
            ("video frame extraction", command)
        } else if classify::is_pdf_mime(mime) {
            let mut command = Command::new(self.config.magick_bin());
            command
                .arg("-density")
                .arg(PDF_DENSITY)
                // First page only; multi-page output would miss the target name.
                .arg(format!("{}[0]", source.full_path.display()))
                .arg("-resize")
                .arg(&width)
                .arg(&target.full_path);
            ("document rasterization", command)
        } else {
            let mut command = Command::new(self.config.magick_bin());
            command
                .arg(&source.full_path)
                .arg("-resize")
                .arg(&width)
                .arg(&target.full_path);
            ("image resize", command)
        };

        match self.run_converter(label, command).await {
            Ok(()) => {
                tracing::debug!("generated preview {} for {}", target.local_path, source.local_path);
                PreviewResult::Generated(target)
            }
            Err(reason) => self.skip(source, reason),
        }
    }

    async fn run_converter(&self, label: &str, mut command: Command) -> Result<(), String> {
        // Reap the child if the timeout drops the future mid-run.
        command.stdin(Stdio::null()).kill_on_drop(true);

        let output = match tokio::time::timeout(CONVERT_TIMEOUT, command.output()).await {
            Err(_) => {
                return Err(format!(
                    "{label} timed out after {}s",
                    CONVERT_TIMEOUT.as_secs()
                ))
            }
            Ok(Err(e)) => return Err(format!("{label} could not start: {e}")),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{label} exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }

    fn skip(&self, source: &NormalizedPath, reason: String) -> PreviewResult {
        tracing::debug!("skipping preview for {}: {}", source.local_path, reason);
        PreviewResult::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn cache_at(root: &Path, magick_bin: &str, ffmpeg_bin: &str) -> PreviewCache {
        let config = EngineConfig::new(
            root.to_path_buf(),
            ".previews".to_string(),
            320,
            magick_bin.to_string(),
            ffmpeg_bin.to_string(),
        )
        .unwrap();
        PreviewCache::new(Arc::new(config))
    }

    #[test]
    fn test_identity_is_deterministic() {
        let cache = cache_at(Path::new("/srv/storage"), "convert", "ffmpeg");
        let a = cache.identity_for(Path::new("/srv/storage/photos/cat.png"));
        let b = cache.identity_for(Path::new("/srv/storage/photos/cat.png"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_differs_per_path() {
        let cache = cache_at(Path::new("/srv/storage"), "convert", "ffmpeg");
        let a = cache.identity_for(Path::new("/srv/storage/photos/cat.png"));
        let b = cache.identity_for(Path::new("/srv/storage/photos/dog.png"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_shape() {
        let cache = cache_at(Path::new("/srv/storage"), "convert", "ffmpeg");
        let identity = cache.identity_for(Path::new("/srv/storage/a/b.png"));

        assert!(identity.local_path.starts_with("/.previews/"));
        assert!(identity.local_path.ends_with(".jpg"));
        assert!(identity
            .full_path
            .starts_with(PathBuf::from("/srv/storage/.previews")));

        // 64 hex chars plus the extension.
        let name = identity.local_path.rsplit('/').next().unwrap();
        assert_eq!(name.len(), 64 + ".jpg".len());
    }

    #[test]
    fn test_identity_with_leading_slash_preview_dir() {
        let config = EngineConfig::new(
            PathBuf::from("/srv/storage"),
            "/.previews".to_string(),
            320,
            "convert".to_string(),
            "ffmpeg".to_string(),
        )
        .unwrap();
        let cache = PreviewCache::new(Arc::new(config));

        // A leading slash on the folder name normalizes away; previews land
        // in the same root subdirectory either way.
        let identity = cache.identity_for(Path::new("/srv/storage/a/b.png"));
        assert!(identity
            .full_path
            .starts_with(PathBuf::from("/srv/storage/.previews")));
    }

    #[tokio::test]
    async fn test_generate_skips_unsupported_type() {
        let temp = TempDir::new().unwrap();
        let cache = cache_at(temp.path(), "convert", "ffmpeg");
        let source = PathResolver::new(temp.path()).normalize("/notes.txt");
        fs::write(&source.full_path, b"plain text").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Skipped(_)));
    }

    #[tokio::test]
    async fn test_generate_ensures_preview_dir_before_dispatch() {
        let temp = TempDir::new().unwrap();
        let cache = cache_at(temp.path(), "convert", "ffmpeg");
        let source = PathResolver::new(temp.path()).normalize("/notes.txt");
        fs::write(&source.full_path, b"plain text").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Skipped(_)));
        // Even a skipped attempt leaves the reserved folder behind.
        assert!(temp.path().join(".previews").is_dir());
    }

    #[tokio::test]
    async fn test_generate_skips_missing_source() {
        let temp = TempDir::new().unwrap();
        let cache = cache_at(temp.path(), "convert", "ffmpeg");
        let source = PathResolver::new(temp.path()).normalize("/ghost.png");

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Skipped(_)));
    }

    #[tokio::test]
    async fn test_generate_skips_when_converter_missing() {
        let temp = TempDir::new().unwrap();
        let cache = cache_at(temp.path(), "/nonexistent/depot-convert", "ffmpeg");
        let source = PathResolver::new(temp.path()).normalize("/img.png");
        fs::write(&source.full_path, b"not really a png").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Skipped(_)));
    }

    #[tokio::test]
    async fn test_generate_skips_on_converter_failure() {
        let temp = TempDir::new().unwrap();
        // `false` exits non-zero for any arguments.
        let cache = cache_at(temp.path(), "false", "false");
        let source = PathResolver::new(temp.path()).normalize("/img.png");
        fs::write(&source.full_path, b"x").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Skipped(_)));
    }

    #[tokio::test]
    async fn test_generate_reports_target_on_converter_success() {
        let temp = TempDir::new().unwrap();
        // `true` exits zero for any arguments, standing in for a converter.
        let cache = cache_at(temp.path(), "true", "true");
        let source = PathResolver::new(temp.path()).normalize("/img.png");
        fs::write(&source.full_path, b"x").unwrap();

        match cache.generate(&source).await {
            PreviewResult::Generated(target) => {
                assert_eq!(target, cache.identity_for(&source.full_path));
            }
            PreviewResult::Skipped(reason) => panic!("unexpected skip: {reason}"),
        }

        // The reserved folder is created on demand.
        assert!(temp.path().join(".previews").is_dir());
    }

    #[tokio::test]
    async fn test_generate_routes_videos_to_ffmpeg() {
        let temp = TempDir::new().unwrap();
        // A failing image converter proves the video path never touches it.
        let cache = cache_at(temp.path(), "false", "true");
        let source = PathResolver::new(temp.path()).normalize("/clip.mp4");
        fs::write(&source.full_path, b"x").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Generated(_)));
    }

    #[tokio::test]
    async fn test_generate_routes_documents_to_magick() {
        let temp = TempDir::new().unwrap();
        let cache = cache_at(temp.path(), "true", "false");
        let source = PathResolver::new(temp.path()).normalize("/scan.pdf");
        fs::write(&source.full_path, b"x").unwrap();

        let result = cache.generate(&source).await;
        assert!(matches!(result, PreviewResult::Generated(_)));
    }
}
