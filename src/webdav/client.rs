//! WebDAV transport client.
//!
//! Issues depth-1 PROPFIND listings against the remote file endpoint and
//! feeds the multistatus body through the property registry and mapper.
//! Retryable failures (timeout, transient network errors) are retried with a
//! linear backoff.

use std::time::Duration;

use log::{debug, error, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tokio::time::sleep;

use super::mapper::{map_listing, RemoteFileRecord};
use super::multistatus::parse_multistatus;
use super::props::PropertyRegistry;

type WebDavResult<T> = std::result::Result<T, WebDavError>;

/// Property set requested for every listing: DAV: core plus the server
/// extension properties the mapper understands.
const PROPFIND_BODY: &str = r#"<?xml version="1.0"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns" xmlns:nc="http://nextcloud.org/ns">
  <d:prop>
    <d:resourcetype/>
    <d:getlastmodified/>
    <d:getcontenttype/>
    <d:getcontentlength/>
    <oc:id/>
    <oc:size/>
    <oc:favorite/>
    <nc:has-preview/>
    <nc:is-encrypted/>
  </d:prop>
</d:propfind>"#;

#[derive(Debug, Clone)]
pub struct WebDavConfig {
    /// Endpoint URL including the DAV path, e.g.
    /// `https://cloud.example.com/remote.php/dav`.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Path below the endpoint all requests are rooted at, e.g.
    /// `/files/alice`.
    pub base_path: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Error)]
pub enum WebDavError {
    #[error("request timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),
}

impl WebDavError {
    fn should_retry(&self) -> bool {
        matches!(self, WebDavError::Timeout | WebDavError::Network(_))
    }
}

impl From<reqwest::Error> for WebDavError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            WebDavError::Timeout
        } else if let Some(status) = error.status() {
            map_status_code(status)
        } else {
            WebDavError::Network(error.to_string())
        }
    }
}

fn map_status_code(code: StatusCode) -> WebDavError {
    match code {
        StatusCode::UNAUTHORIZED => WebDavError::Authentication("unauthorized".to_string()),
        StatusCode::FORBIDDEN => WebDavError::Permission("forbidden".to_string()),
        StatusCode::NOT_FOUND => WebDavError::NotFound("resource does not exist".to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => WebDavError::Timeout,
        _ if code.is_server_error() => WebDavError::Network(format!("server error: {}", code)),
        _ => WebDavError::UnexpectedStatus(code),
    }
}

pub struct WebDavClient {
    http: reqwest::Client,
    host: String,
    username: String,
    password: String,
    base_path: String,
    registry: PropertyRegistry,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl WebDavClient {
    pub fn new(config: WebDavConfig) -> WebDavResult<Self> {
        Self::with_registry(config, PropertyRegistry::standard())
    }

    /// Builds a client with a caller-supplied property registry, for servers
    /// that ship additional extension properties.
    pub fn with_registry(config: WebDavConfig, registry: PropertyRegistry) -> WebDavResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WebDavError::Network(format!("building HTTP client failed: {}", e)))?;

        Ok(Self {
            http,
            host: config.host,
            username: config.username,
            password: config.password,
            base_path: normalize_base_path(&config.base_path),
            registry,
            retry_attempts: config.retry_attempts,
            retry_backoff: config.retry_backoff,
        })
    }

    /// Lists a directory (depth 1) and returns one record per resource,
    /// including the requested collection itself as the first entry.
    pub async fn list(&self, path: &str) -> WebDavResult<Vec<RemoteFileRecord>> {
        let target = self.full_path(path);
        debug!("listing {}", target);
        let body = self.propfind(&target).await?;
        let responses = parse_multistatus(&body, &self.registry)?;
        Ok(map_listing(&responses, &self.href_prefix()))
    }

    /// Like [`list`](Self::list) but with the requested collection itself
    /// filtered out, leaving only its members.
    pub async fn list_files(&self, path: &str) -> WebDavResult<Vec<RemoteFileRecord>> {
        let requested = relative_path(path);
        let mut records = self.list(path).await?;
        records.retain(|record| {
            record.path.trim_end_matches('/') != requested.trim_end_matches('/')
        });
        Ok(records)
    }

    /// True when the endpoint answers a depth-0 listing of the base path.
    pub async fn is_connected(&self) -> bool {
        self.propfind_with_depth(&self.full_path(""), "0").await.is_ok()
    }

    async fn propfind(&self, target: &str) -> WebDavResult<String> {
        self.propfind_with_depth(target, "1").await
    }

    async fn propfind_with_depth(&self, target: &str, depth: &str) -> WebDavResult<String> {
        let url = format!("{}{}", self.host.trim_end_matches('/'), target);
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| WebDavError::Protocol(format!("invalid method: {}", e)))?;

        let response = self
            .retry("propfind", || {
                let url = url.clone();
                let method = method.clone();
                async move {
                    self.http
                        .request(method, &url)
                        .basic_auth(&self.username, Some(&self.password))
                        .header("Depth", depth)
                        .header(CONTENT_TYPE, "application/xml")
                        .body(PROPFIND_BODY)
                        .send()
                        .await
                        .map_err(WebDavError::from)
                }
            })
            .await?;

        match response.status() {
            StatusCode::MULTI_STATUS => response
                .text()
                .await
                .map_err(|e| WebDavError::Network(format!("reading response failed: {}", e))),
            status => Err(map_status_code(status)),
        }
    }

    /// Decoded href prefix of the listing root, stripped from reported hrefs
    /// when mapping records.
    fn href_prefix(&self) -> String {
        let endpoint = host_path(&self.host).trim_end_matches('/');
        if self.base_path == "/" {
            endpoint.to_string()
        } else {
            format!("{}{}", endpoint, self.base_path)
        }
    }

    fn full_path(&self, relative: &str) -> String {
        let relative = relative.trim_matches('/');
        if self.base_path == "/" {
            if relative.is_empty() {
                "/".to_string()
            } else {
                format!("/{}", relative)
            }
        } else if relative.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}/{}", self.base_path.trim_end_matches('/'), relative)
        }
    }

    async fn retry<F, Fut, T>(&self, op: &str, mut action: F) -> WebDavResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WebDavResult<T>>,
    {
        for attempt in 0..=self.retry_attempts {
            match action().await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    if attempt == self.retry_attempts || !err.should_retry() {
                        error!("{} failed after {} attempts: {}", op, attempt + 1, err);
                        return Err(err);
                    }
                    let backoff = self.retry_backoff * (attempt + 1);
                    warn!(
                        "{} failed (attempt {}): {}. retrying in {:?}",
                        op,
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                }
            }
        }

        Err(WebDavError::Network(format!("{}: retries exhausted", op)))
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        "/".to_string()
    } else {
        format!("/{}", trimmed.trim_matches('/'))
    }
}

fn relative_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Path portion of an endpoint URL, e.g. `/remote.php/dav` for
/// `https://cloud.example.com/remote.php/dav`.
fn host_path(host: &str) -> &str {
    host.find("://")
        .map(|i| &host[i + 3..])
        .and_then(|rest| rest.find('/').map(|j| &rest[j..]))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn build_client(host: String, base_path: &str) -> WebDavClient {
        WebDavClient::new(WebDavConfig {
            host,
            username: "alice".to_string(),
            password: "secret".to_string(),
            base_path: base_path.to_string(),
            timeout: Duration::from_secs(5),
            retry_attempts: 0,
            retry_backoff: Duration::from_millis(1),
        })
        .unwrap()
    }

    fn sample_propfind_response() -> String {
        r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns" xmlns:nc="http://nextcloud.org/ns">
            <d:response>
                <d:href>/files/alice/Photos/</d:href>
                <d:propstat>
                    <d:prop>
                        <d:resourcetype><d:collection/></d:resourcetype>
                        <d:getlastmodified>Tue, 14 Nov 2023 22:13:20 +0000</d:getlastmodified>
                        <oc:size>123456</oc:size>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
            <d:response>
                <d:href>/files/alice/Photos/Sunny%20Day.jpg</d:href>
                <d:propstat>
                    <d:prop>
                        <d:resourcetype/>
                        <d:getlastmodified>Thu, 11 Apr 2019 14:00:00 GMT</d:getlastmodified>
                        <d:getcontenttype>image/jpeg</d:getcontenttype>
                        <d:getcontentlength>65536</d:getcontentlength>
                        <oc:id>00000043oc</oc:id>
                        <oc:favorite>1</oc:favorite>
                        <nc:has-preview>true</nc:has-preview>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#
            .to_string()
    }

    #[tokio::test]
    async fn list_issues_depth_one_propfind_and_maps_records() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PROPFIND", "/files/alice/Photos")
            .match_header("depth", "1")
            .with_status(207)
            .with_header("content-type", "application/xml; charset=utf-8")
            .with_body(sample_propfind_response())
            .create_async()
            .await;

        let client = build_client(server.url(), "/files/alice");
        let records = client.list("Photos").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);

        let dir = &records[0];
        assert_eq!(dir.path, "/Photos/");
        assert!(!dir.is_file());
        assert_eq!(dir.mime_type, "inode/directory");
        assert_eq!(dir.size_bytes, 123456);
        assert_eq!(dir.modified_timestamp, 1700000000);

        let file = &records[1];
        assert_eq!(file.path, "/Photos/Sunny Day.jpg");
        assert_eq!(file.display_name, "Sunny Day.jpg");
        assert!(file.is_file());
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.size_bytes, 65536);
        assert_eq!(file.remote_id, "00000043oc");
        assert!(file.favorite);
        assert!(file.has_preview);
    }

    #[tokio::test]
    async fn list_files_drops_the_requested_collection() {
        let mut server = Server::new_async().await;
        server
            .mock("PROPFIND", "/files/alice/Photos")
            .with_status(207)
            .with_body(sample_propfind_response())
            .create_async()
            .await;

        let client = build_client(server.url(), "/files/alice");
        let records = client.list_files("Photos").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "Sunny Day.jpg");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_error() {
        let mut server = Server::new_async().await;
        server
            .mock("PROPFIND", "/files/alice/Photos")
            .with_status(401)
            .create_async()
            .await;

        let client = build_client(server.url(), "/files/alice");
        assert!(matches!(
            client.list("Photos").await,
            Err(WebDavError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn missing_directory_maps_to_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("PROPFIND", "/files/alice/Nope")
            .with_status(404)
            .create_async()
            .await;

        let client = build_client(server.url(), "/files/alice");
        assert!(matches!(
            client.list("Nope").await,
            Err(WebDavError::NotFound(_))
        ));
    }

    #[test]
    fn full_path_joins_base_and_relative() {
        let client = build_client("http://example.com".to_string(), "/files/alice");
        assert_eq!(client.full_path("Photos"), "/files/alice/Photos");
        assert_eq!(client.full_path(""), "/files/alice");

        let rooted = build_client("http://example.com".to_string(), "/");
        assert_eq!(rooted.full_path("Photos"), "/Photos");
        assert_eq!(rooted.full_path(""), "/");
    }

    #[test]
    fn href_prefix_combines_endpoint_path_and_base() {
        let client = build_client(
            "https://cloud.example.com/remote.php/dav".to_string(),
            "/files/alice",
        );
        assert_eq!(client.href_prefix(), "/remote.php/dav/files/alice");

        let bare = build_client("http://127.0.0.1:8080".to_string(), "/files/alice");
        assert_eq!(bare.href_prefix(), "/files/alice");
    }
}
