//! WebDAV property model and parser registry.
//!
//! Properties are a tagged union keyed by (namespace, local name). Which
//! properties the listing understands is an explicit, constructed mapping
//! passed to the parser as configuration, so servers can ship extension
//! properties without any process-wide registry mutation.

use std::collections::HashMap;

use chrono::DateTime;

/// The `DAV:` core namespace.
pub const NS_DAV: &str = "DAV:";
/// ownCloud extension namespace (`oc:` prefix on the wire).
pub const NS_OWNCLOUD: &str = "http://owncloud.org/ns";
/// Nextcloud extension namespace (`nc:` prefix on the wire).
pub const NS_NEXTCLOUD: &str = "http://nextcloud.org/ns";

/// One typed attribute of a remote resource.
#[derive(Debug, Clone, PartialEq)]
pub enum DavProperty {
    /// `d:resourcetype`; `collection` is the directory marker.
    ResourceType { collection: bool },
    /// `d:getlastmodified`, epoch seconds.
    LastModified(i64),
    /// `d:getcontenttype`.
    ContentType(String),
    /// `d:getcontentlength`, bytes.
    ContentLength(i64),
    /// `oc:id`, the server-assigned stable file id.
    RemoteId(String),
    /// `oc:size`, bytes; also set on collections.
    Size(i64),
    /// `oc:favorite`.
    Favorite(bool),
    /// `nc:has-preview`.
    HasPreview(bool),
    /// `nc:is-encrypted`.
    IsEncrypted(bool),
}

/// A property element as read off the wire, before interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawProperty {
    pub namespace: String,
    pub name: String,
    /// Concatenated text content of the element.
    pub text: String,
    /// Local names of nested child elements (e.g. `collection` under
    /// `resourcetype`).
    pub children: Vec<String>,
}

/// Parses one raw property into its typed form. Returning `None` means the
/// value was malformed or uninteresting; the listing ignores it.
pub type PropertyParser = fn(&RawProperty) -> Option<DavProperty>;

/// Explicit mapping from (namespace, local name) to parser function.
pub struct PropertyRegistry {
    parsers: HashMap<(String, String), PropertyParser>,
}

impl PropertyRegistry {
    /// A registry with no parsers; every property is ignored.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// The standard set: DAV: core properties plus the ownCloud/Nextcloud
    /// extension properties the file browser consumes.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(NS_DAV, "resourcetype", parse_resource_type);
        registry.register(NS_DAV, "getlastmodified", parse_last_modified);
        registry.register(NS_DAV, "getcontenttype", parse_content_type);
        registry.register(NS_DAV, "getcontentlength", parse_content_length);
        registry.register(NS_OWNCLOUD, "id", parse_remote_id);
        registry.register(NS_OWNCLOUD, "size", parse_size);
        registry.register(NS_OWNCLOUD, "favorite", parse_favorite);
        registry.register(NS_NEXTCLOUD, "has-preview", parse_has_preview);
        registry.register(NS_NEXTCLOUD, "is-encrypted", parse_is_encrypted);
        registry
    }

    pub fn register(&mut self, namespace: &str, name: &str, parser: PropertyParser) {
        self.parsers
            .insert((namespace.to_string(), name.to_string()), parser);
    }

    /// Looks up and runs the parser for a raw property, if one is registered.
    pub fn parse(&self, raw: &RawProperty) -> Option<DavProperty> {
        let parser = self
            .parsers
            .get(&(raw.namespace.clone(), raw.name.clone()))?;
        parser(raw)
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_resource_type(raw: &RawProperty) -> Option<DavProperty> {
    Some(DavProperty::ResourceType {
        collection: raw.children.iter().any(|c| c == "collection"),
    })
}

fn parse_last_modified(raw: &RawProperty) -> Option<DavProperty> {
    // Servers emit RFC 1123 dates ("Thu, 11 Apr 2019 14:00:00 GMT").
    DateTime::parse_from_rfc2822(raw.text.trim())
        .ok()
        .map(|dt| DavProperty::LastModified(dt.timestamp()))
}

fn parse_content_type(raw: &RawProperty) -> Option<DavProperty> {
    Some(DavProperty::ContentType(raw.text.trim().to_string()))
}

fn parse_content_length(raw: &RawProperty) -> Option<DavProperty> {
    raw.text
        .trim()
        .parse::<i64>()
        .ok()
        .map(DavProperty::ContentLength)
}

fn parse_remote_id(raw: &RawProperty) -> Option<DavProperty> {
    Some(DavProperty::RemoteId(raw.text.trim().to_string()))
}

fn parse_size(raw: &RawProperty) -> Option<DavProperty> {
    raw.text.trim().parse::<i64>().ok().map(DavProperty::Size)
}

fn parse_favorite(raw: &RawProperty) -> Option<DavProperty> {
    bool_value(&raw.text).map(DavProperty::Favorite)
}

fn parse_has_preview(raw: &RawProperty) -> Option<DavProperty> {
    bool_value(&raw.text).map(DavProperty::HasPreview)
}

fn parse_is_encrypted(raw: &RawProperty) -> Option<DavProperty> {
    bool_value(&raw.text).map(DavProperty::IsEncrypted)
}

fn bool_value(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}
