//! Talk client core library
//!
//! Client-side building blocks for a Nextcloud-Talk-style collaboration
//! client: verified push notification decryption and WebDAV remote file
//! listing.

pub mod config;
pub mod push;
pub mod webdav;

// Re-export commonly used types
pub use config::Config;
pub use push::{DecryptedNotification, EncryptedNotification, PushDecryptor, PushError};
pub use webdav::{RemoteFileRecord, WebDavClient, WebDavConfig, WebDavError};
