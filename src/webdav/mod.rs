//! WebDAV remote file listing.
//!
//! `client` issues the depth-1 PROPFIND, `multistatus` parses the 207 body
//! into per-resource property sets, `props` defines the typed property model
//! and its parser registry, and `mapper` folds each property set into a
//! normalized [`RemoteFileRecord`].

pub mod client;
pub mod mapper;
pub mod multistatus;
pub mod props;

pub use client::{WebDavClient, WebDavConfig, WebDavError};
pub use mapper::{map_listing, RemoteFileRecord, DIRECTORY_MIME_TYPE};
pub use multistatus::{parse_multistatus, DavResponse};
pub use props::{DavProperty, PropertyRegistry, RawProperty};
