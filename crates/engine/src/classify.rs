//! Content-type classification and filename derivation.
//!
//! Two independent classification paths that agree where they overlap:
//! extension lookup for entries already on disk, and magic-number sniffing
//! for inline payloads that arrive without a trustworthy name. Sniffing
//! compares the *encoded* text prefix against precomputed encoded forms of
//! each magic number, so payloads are classified without decoding them
//! first. Both paths are total: anything unrecognized falls back to the
//! default type, never an error.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::Metadata;
use std::path::Path;

/// Literal type label for directories, checked before any extension lookup.
pub const DIRECTORY_MIME: &str = "directory";

/// Fallback type for anything the tables do not recognize.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Fallback extension for the default type.
pub const DEFAULT_EXT: &str = "data";

/// Length of generated random identifiers. 32 characters over the 62-symbol
/// alphanumeric alphabet makes collisions within one storage root negligible.
const ID_LENGTH: usize = 32;

/// Known type ↔ extension pairs. Lookup misses fall back to
/// [`DEFAULT_MIME`] / [`DEFAULT_EXT`].
const MIME_EXT: [(&str, &str); 7] = [
    ("application/pdf", "pdf"),
    ("image/gif", "gif"),
    ("image/png", "png"),
    ("image/jpg", "jpg"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/x-msvideo", "avi"),
];

/// Base64 text prefixes of known magic numbers. First match wins.
const ENCODED_SIGNATURES: [(&str, &str); 4] = [
    ("JVBERi0", "application/pdf"),
    ("R0lGOD", "image/gif"),
    ("iVBORw0KGgo", "image/png"),
    ("/9j/", "image/jpg"),
];

/// Classify an on-disk entry from its path and stat result.
///
/// Directories always classify as the [`DIRECTORY_MIME`] literal. Files are
/// classified by the lower-cased text after the last `.` in the full path;
/// a path with no dot at all cannot match and yields the default.
pub fn mime_for_path(path: &Path, metadata: &Metadata) -> &'static str {
    if metadata.is_dir() {
        return DIRECTORY_MIME;
    }

    let text = path.to_string_lossy();
    let ext = text.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    MIME_EXT
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(m, _)| *m)
        .unwrap_or(DEFAULT_MIME)
}

/// Canonical extension for a type label, [`DEFAULT_EXT`] when unknown.
pub fn ext_for_mime(mime: &str) -> &'static str {
    MIME_EXT
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, e)| *e)
        .unwrap_or(DEFAULT_EXT)
}

/// Sniff a type label from the prefix of a base64-encoded payload.
pub fn mime_from_encoded(encoded: &str) -> &'static str {
    ENCODED_SIGNATURES
        .iter()
        .find(|(prefix, _)| encoded.starts_with(prefix))
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_MIME)
}

/// Canonical extension implied by sniffing a base64-encoded payload.
pub fn ext_from_encoded(encoded: &str) -> &'static str {
    ext_for_mime(mime_from_encoded(encoded))
}

pub fn is_image_mime(mime: &str) -> bool {
    matches!(mime, "image/png" | "image/jpg" | "image/gif")
}

pub fn is_pdf_mime(mime: &str) -> bool {
    mime == "application/pdf"
}

pub fn is_video_mime(mime: &str) -> bool {
    matches!(mime, "video/mp4" | "video/quicktime" | "video/x-msvideo")
}

/// Generate a random 32-character alphanumeric identifier.
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Derive the filename for a URL upload.
///
/// An explicit non-empty `requested` name always wins. Otherwise the URL's
/// last path segment before any query string is used; when that extraction
/// comes up empty (URL ends in `/`), fall back to a random identifier plus
/// the extension implied by the fetch response's content type.
pub fn file_name_for_url(requested: Option<&str>, url: &str, response_mime: &str) -> String {
    if let Some(name) = requested.filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let before_query = url.split('?').next().unwrap_or("");
    let last_segment = before_query.rsplit('/').next().unwrap_or("");
    if last_segment.is_empty() {
        format!("{}.{}", random_id(), ext_for_mime(response_mime))
    } else {
        last_segment.to_string()
    }
}

/// Derive the filename for an inline payload upload.
///
/// An explicit non-empty `requested` name always wins; otherwise a random
/// identifier plus the extension implied by sniffing the encoded payload.
pub fn file_name_for_payload(requested: Option<&str>, encoded: &str) -> String {
    if let Some(name) = requested.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    format!("{}.{}", random_id(), ext_from_encoded(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn stat_of(path: &Path) -> Metadata {
        fs::metadata(path).unwrap()
    }

    #[test]
    fn test_directory_classifies_before_extension() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("album.png");
        fs::create_dir(&dir).unwrap();

        assert_eq!(mime_for_path(&dir, &stat_of(&dir)), DIRECTORY_MIME);
    }

    #[test]
    fn test_known_extensions_classify() {
        let temp = TempDir::new().unwrap();
        let cases = [
            ("report.pdf", "application/pdf"),
            ("anim.gif", "image/gif"),
            ("shot.png", "image/png"),
            ("photo.jpg", "image/jpg"),
            ("clip.mp4", "video/mp4"),
            ("clip.mov", "video/quicktime"),
            ("clip.avi", "video/x-msvideo"),
        ];
        for (name, expected) in cases {
            let path = temp.path().join(name);
            fs::write(&path, b"x").unwrap();
            assert_eq!(mime_for_path(&path, &stat_of(&path)), expected, "{name}");
        }
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("SCAN.PDF");
        fs::write(&path, b"x").unwrap();

        assert_eq!(mime_for_path(&path, &stat_of(&path)), "application/pdf");
    }

    #[test]
    fn test_unknown_and_missing_extensions_default() {
        let temp = TempDir::new().unwrap();
        for name in ["notes.txt", "no_extension", "weird.tar.xz"] {
            let path = temp.path().join(name);
            fs::write(&path, b"x").unwrap();
            assert_eq!(mime_for_path(&path, &stat_of(&path)), DEFAULT_MIME, "{name}");
        }
    }

    #[test]
    fn test_ext_for_mime_both_ways() {
        assert_eq!(ext_for_mime("application/pdf"), "pdf");
        assert_eq!(ext_for_mime("video/quicktime"), "mov");
        assert_eq!(ext_for_mime("image/png"), "png");
        assert_eq!(ext_for_mime("text/html"), DEFAULT_EXT);
        assert_eq!(ext_for_mime(""), DEFAULT_EXT);
    }

    #[test]
    fn test_sniffing_known_prefixes() {
        assert_eq!(mime_from_encoded("JVBERi0xLjQKJcfs"), "application/pdf");
        assert_eq!(mime_from_encoded("R0lGODlhAQABAIAAAP"), "image/gif");
        assert_eq!(mime_from_encoded("iVBORw0KGgoAAAANSUhEUg"), "image/png");
        assert_eq!(mime_from_encoded("/9j/4AAQSkZJRg"), "image/jpg");
    }

    #[test]
    fn test_sniffing_is_total() {
        assert_eq!(mime_from_encoded(""), DEFAULT_MIME);
        assert_eq!(mime_from_encoded("AAAA"), DEFAULT_MIME);
        // Prefix must sit at the very start.
        assert_eq!(mime_from_encoded("xJVBERi0"), DEFAULT_MIME);
    }

    #[test]
    fn test_ext_from_encoded() {
        assert_eq!(ext_from_encoded("iVBORw0KGgoAAAA"), "png");
        assert_eq!(ext_from_encoded("c29tZSB0ZXh0"), DEFAULT_EXT);
    }

    #[test]
    fn test_predicates() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("image/jpg"));
        assert!(is_image_mime("image/gif"));
        assert!(!is_image_mime("video/mp4"));

        assert!(is_pdf_mime("application/pdf"));
        assert!(!is_pdf_mime("application/octet-stream"));

        assert!(is_video_mime("video/mp4"));
        assert!(is_video_mime("video/quicktime"));
        assert!(is_video_mime("video/x-msvideo"));
        assert!(!is_video_mime("image/png"));
        assert!(!is_video_mime(DIRECTORY_MIME));
    }

    #[test]
    fn test_random_id_shape() {
        let id = random_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(random_id(), random_id());
    }

    #[test]
    fn test_url_name_explicit_wins() {
        let name = file_name_for_url(Some("given.png"), "http://host/other.pdf", "image/png");
        assert_eq!(name, "given.png");
    }

    #[test]
    fn test_url_name_empty_explicit_falls_through() {
        let name = file_name_for_url(Some(""), "http://host/dir/file.pdf", "application/pdf");
        assert_eq!(name, "file.pdf");
    }

    #[test]
    fn test_url_name_strips_query_string() {
        let name = file_name_for_url(None, "https://host/a/report.pdf?token=xyz", "text/html");
        assert_eq!(name, "report.pdf");
    }

    #[test]
    fn test_url_name_falls_back_when_segment_empty() {
        let name = file_name_for_url(None, "https://host/gallery/", "image/png");
        assert_eq!(name.len(), 32 + ".png".len());
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_url_name_fallback_with_unknown_content_type() {
        let name = file_name_for_url(None, "https://host/", "text/html; charset=utf-8");
        assert!(name.ends_with(".data"));
    }

    #[test]
    fn test_payload_name_explicit_wins() {
        assert_eq!(
            file_name_for_payload(Some("photo.png"), "/9j/AAAA"),
            "photo.png"
        );
    }

    #[test]
    fn test_payload_name_generated_from_sniff() {
        let name = file_name_for_payload(None, "iVBORw0KGgoAAAANSUhEUg");
        assert_eq!(name.len(), 32 + ".png".len());
        assert!(name.ends_with(".png"));

        let fallback = file_name_for_payload(None, "c29tZSB0ZXh0");
        assert!(fallback.ends_with(".data"));
    }
}
