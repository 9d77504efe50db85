//! Folding per-resource property sets into uniform file records.
//!
//! The fold is pure and single-pass: each field is set only when the
//! corresponding property is present, everything else keeps its default.

use percent_encoding::percent_decode_str;

use super::multistatus::DavResponse;
use super::props::DavProperty;

/// MIME sentinel assigned to directories that report no content type.
pub const DIRECTORY_MIME_TYPE: &str = "inode/directory";

/// Normalized descriptor of one remote resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteFileRecord {
    /// Decoded path relative to the listing root, leading slash included.
    pub path: String,
    /// Decoded final path segment.
    pub display_name: String,
    pub mime_type: String,
    /// Last modification time, epoch seconds.
    pub modified_timestamp: i64,
    pub size_bytes: i64,
    pub is_directory: bool,
    /// Server-assigned stable file id.
    pub remote_id: String,
    pub has_preview: bool,
    pub favorite: bool,
    pub encrypted: bool,
}

impl RemoteFileRecord {
    /// Builds one record from a resource response. `base_prefix` is the
    /// already-decoded href prefix of the listing root (server endpoint path
    /// plus base path) to strip from reported hrefs.
    pub fn from_response(response: &DavResponse, base_prefix: &str) -> Self {
        let path = path_from_href(&response.href, base_prefix);
        let display_name = display_name_of(&path);

        let mut record = Self {
            path,
            display_name,
            ..Self::default()
        };

        for property in &response.props {
            match property {
                DavProperty::ResourceType { collection } => record.is_directory = *collection,
                DavProperty::LastModified(ts) => record.modified_timestamp = *ts,
                DavProperty::ContentType(mime) => record.mime_type = mime.clone(),
                DavProperty::ContentLength(bytes) => record.size_bytes = *bytes,
                DavProperty::Size(bytes) => record.size_bytes = *bytes,
                DavProperty::RemoteId(id) => record.remote_id = id.clone(),
                DavProperty::Favorite(flag) => record.favorite = *flag,
                DavProperty::HasPreview(flag) => record.has_preview = *flag,
                DavProperty::IsEncrypted(flag) => record.encrypted = *flag,
            }
        }

        if record.is_directory && record.mime_type.is_empty() {
            record.mime_type = DIRECTORY_MIME_TYPE.to_string();
        }

        record
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// Maps a listing response set to records, order-preserving.
pub fn map_listing(responses: &[DavResponse], base_prefix: &str) -> Vec<RemoteFileRecord> {
    responses
        .iter()
        .map(|response| RemoteFileRecord::from_response(response, base_prefix))
        .collect()
}

fn path_from_href(href: &str, base_prefix: &str) -> String {
    let decoded = percent_decode_str(href).decode_utf8_lossy().into_owned();
    let stripped = decoded
        .strip_prefix(base_prefix)
        .unwrap_or(decoded.as_str());
    if stripped.is_empty() || stripped == "/" {
        "/".to_string()
    } else {
        format!("/{}", stripped.trim_start_matches('/'))
    }
}

fn display_name_of(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
