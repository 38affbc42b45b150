//! Client-facing metadata and upload request types.
//!
//! Field names are wire names: these structs serialize exactly as the
//! transport emits and accepts them.

/// Metadata view of one stored entry.
///
/// Produced on demand from a filesystem stat, never persisted. `thumbnail`
/// is present only for non-directory entries and reflects where the preview
/// *would* live; its existence is not guaranteed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Canonical local path of the entry itself.
    pub src: String,

    /// Canonical local path of the entry's parent directory.
    pub path: String,

    /// Final path component.
    pub name: String,

    /// Content-type label, or the literal `"directory"`.
    pub mime: String,

    /// Size in bytes as reported by stat.
    pub size: u64,

    /// Creation time in epoch milliseconds. Filesystems without birth-time
    /// support report the modification time here instead.
    pub created: i64,

    /// Modification time in epoch milliseconds.
    pub modified: i64,

    /// Local path of the entry's would-be preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Directory listing partitioned on the directory literal.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub folders: Vec<Item>,
    pub files: Vec<Item>,
}

/// One member of an upload-by-URL batch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadByUrlRequest {
    /// Remote resource to fetch.
    pub url: String,

    /// Target directory, created if missing.
    pub path: String,

    /// Explicit filename; derived from the URL when absent or empty.
    #[serde(default)]
    pub name: Option<String>,
}

/// One member of an upload-by-payload batch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadByPayloadRequest {
    /// Standard base64 encoding of the file content.
    pub base64: String,

    /// Target directory, created if missing.
    pub path: String,

    /// Explicit filename; derived by sniffing the payload when absent or
    /// empty.
    #[serde(default)]
    pub name: Option<String>,
}
