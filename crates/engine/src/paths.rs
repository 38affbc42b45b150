//! Path normalization and root containment.
//!
//! Every client-supplied path is rewritten into a [`NormalizedPath`] before it
//! touches the filesystem. Normalization is containment-by-construction, not
//! containment-by-validation: segments that could walk upward (`..`), stay in
//! place (`.`) or collapse (`//`) are discarded outright, so the rooted
//! absolute form can never leave the storage root and no second validation
//! pass is needed downstream.

use std::path::{Path, PathBuf};

/// A client path rewritten into its two canonical forms.
///
/// # Invariant
///
/// `full_path` is always the storage root itself or a descendant of it,
/// regardless of the input string it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    /// Rooted absolute path, used for filesystem access.
    pub full_path: PathBuf,

    /// Canonical local path with a leading `/`, used in client-facing
    /// metadata. The root itself is `/`.
    pub local_path: String,
}

/// Converts client-supplied paths into root-contained locations.
///
/// The resolver owns the configured storage root and nothing else; it is
/// cheap to clone and performs no I/O.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize a client path into its rooted and local forms.
    ///
    /// Pure and deterministic, with no error case: any input, including the
    /// empty string or pure traversal sequences, normalizes to a path at or
    /// under the root.
    ///
    /// # Arguments
    ///
    /// * `input` - Any path string; separators are `/` regardless of platform
    ///
    /// # Returns
    ///
    /// The [`NormalizedPath`] for the surviving segments; empty input yields
    /// the root itself.
    pub fn normalize(&self, input: &str) -> NormalizedPath {
        let kept: Vec<&str> = input
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .collect();

        let joined = kept.join("/");
        let full_path = if joined.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&joined)
        };

        NormalizedPath {
            full_path,
            local_path: format!("/{joined}"),
        }
    }
}
