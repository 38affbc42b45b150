//! Engine runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! engine behind an `Arc`. Request handling never reads process-wide
//! environment variables, which keeps behaviour consistent across
//! multi-threaded runtimes and test harnesses.

use crate::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

/// Default storage root when the environment provides none.
pub const DEFAULT_STORAGE_ROOT: &str = "/depot_data";

/// Default name of the reserved preview folder under the storage root.
pub const DEFAULT_PREVIEW_DIR: &str = ".previews";

/// Default target width of generated previews, in pixels.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 320;

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    storage_root: PathBuf,
    preview_dir: String,
    preview_width: u32,
    magick_bin: String,
    ffmpeg_bin: String,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` if:
    /// - `preview_dir` normalizes to the storage root itself (empty, `/`, or
    ///   made up entirely of discarded segments); previews must live in a
    ///   real subdirectory so listings can exclude them,
    /// - `preview_width` is zero, or
    /// - either converter binary name is blank.
    pub fn new(
        storage_root: PathBuf,
        preview_dir: String,
        preview_width: u32,
        magick_bin: String,
        ffmpeg_bin: String,
    ) -> EngineResult<Self> {
        let has_segment = preview_dir
            .split('/')
            .any(|s| !s.is_empty() && s != "." && s != "..");
        if !has_segment {
            return Err(EngineError::InvalidConfig(
                "preview_dir must name a subdirectory of the storage root".into(),
            ));
        }

        if preview_width == 0 {
            return Err(EngineError::InvalidConfig(
                "preview_width cannot be zero".into(),
            ));
        }

        if magick_bin.trim().is_empty() || ffmpeg_bin.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "converter binary names cannot be empty".into(),
            ));
        }

        Ok(Self {
            storage_root,
            preview_dir,
            preview_width,
            magick_bin,
            ffmpeg_bin,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn preview_dir(&self) -> &str {
        &self.preview_dir
    }

    pub fn preview_width(&self) -> u32 {
        self.preview_width
    }

    pub fn magick_bin(&self) -> &str {
        &self.magick_bin
    }

    pub fn ffmpeg_bin(&self) -> &str {
        &self.ffmpeg_bin
    }
}
