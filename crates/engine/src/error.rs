/// Errors surfaced by storage engine operations.
///
/// Preview generation is deliberately absent from this taxonomy: preview
/// failures are swallowed inside [`crate::PreviewCache`] and never reach the
/// caller of an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metadata lookup against a path with no filesystem entry behind it.
    /// Carries the normalized local path, not the rooted absolute path.
    #[error("no such entry: {0}")]
    NotFound(String),

    #[error("failed to stat {path}: {source}", path = path.display())]
    Stat {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}", path = path.display())]
    DirCreation {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory {path}: {source}", path = path.display())]
    DirRead {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}", path = path.display())]
    FileWrite {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}", path = path.display())]
    Removal {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build http client: {0}")]
    HttpClient(reqwest::Error),

    #[error("failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("fetch of {url} answered {status}")]
    FetchStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The inline payload was not decodable base64. Undecodable input is
    /// rejected up front, never written as garbage bytes.
    #[error("undecodable payload for {name}: {source}")]
    PayloadDecode {
        name: String,
        source: base64::DecodeError,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
