//! Object stores the catalog can be fetched from.
//!
//! The loader only needs "give me the bytes for bucket/key", so that is the
//! whole [`ObjectStore`] trait. Three implementations ship:
//!
//! - [`S3ObjectStore`]: signed `GetObject` through the AWS SDK, with the
//!   default credential chain (env, profile, instance/task role)
//! - [`HttpObjectStore`]: unsigned path-style `GET` against a custom
//!   S3-compatible endpoint (MinIO, LocalStack, a presigning proxy)
//! - [`LocalFileStore`]: `{root}/{key}` on disk, for development and tests

use crate::error::{CatalogLoadError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Read-only access to a single object in a remote (or local) store
pub trait ObjectStore: Send + Sync {
    /// Human-readable location for logs, e.g. `s3://bucket/key`
    fn describe(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }

    /// Fetch the full object body
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// AWS S3
// =============================================================================

/// Signed S3 reads through the AWS SDK.
///
/// The SDK is async and [`ObjectStore`] is not, so the store drives its
/// requests on a private current-thread runtime. Call it from a plain or
/// blocking thread (e.g. inside `spawn_blocking`), never from async code.
pub struct S3ObjectStore {
    client: S3Client,
    runtime: Runtime,
}

impl S3ObjectStore {
    /// Client for `region` using the default credential chain
    pub fn new(region: impl Into<String>) -> Result<Self> {
        let region: String = region.into();
        let runtime = current_thread_runtime()?;
        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region))
                .load(),
        );

        Ok(Self {
            client: S3Client::new(&sdk_config),
            runtime,
        })
    }

    /// Wrap an already configured client
    pub fn from_client(client: S3Client) -> Result<Self> {
        Ok(Self {
            client,
            runtime: current_thread_runtime()?,
        })
    }
}

fn current_thread_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

impl ObjectStore for S3ObjectStore {
    fn describe(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let location = self.describe(bucket, key);
        debug!("GetObject {}", location);

        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| sdk_error_to_catalog(e, location.clone()))?;

            let body = output
                .body
                .collect()
                .await
                .map_err(|e| CatalogLoadError::Remote {
                    location: location.clone(),
                    reason: format!("Failed to read body: {}", e),
                })?;

            Ok::<_, CatalogLoadError>(body.into_bytes().to_vec())
        })
    }
}

fn sdk_error_to_catalog(err: SdkError<GetObjectError>, location: String) -> CatalogLoadError {
    let status = err.raw_response().map(|r| r.status().as_u16());
    let reason = DisplayErrorContext(&err).to_string();
    let service_error = err.into_service_error();
    if service_error.is_no_such_key() {
        return CatalogLoadError::NotFound { location };
    }
    s3_error_to_catalog(service_error.code(), status, location, reason)
}

/// Map an S3 error code (or, without one, the HTTP status) to the loader's
/// error classes
fn s3_error_to_catalog(
    code: Option<&str>,
    status: Option<u16>,
    location: String,
    reason: String,
) -> CatalogLoadError {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket"), _) | (None, Some(404)) => {
            CatalogLoadError::NotFound { location }
        }
        (
            Some(
                "AccessDenied"
                | "AllAccessDisabled"
                | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch"
                | "ExpiredToken"
                | "InvalidToken",
            ),
            _,
        )
        | (None, Some(401 | 403)) => CatalogLoadError::AccessDenied { location },
        _ => CatalogLoadError::Remote { location, reason },
    }
}

// =============================================================================
// HTTP (custom endpoint)
// =============================================================================

/// Fetches objects with an unsigned path-style GET: `{endpoint}/{bucket}/{key}`.
///
/// Only for endpoints that need no AWS signature; private AWS buckets go
/// through [`S3ObjectStore`].
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// URL the object will be requested from
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            bucket,
            key.trim_start_matches('/')
        )
    }
}

impl ObjectStore for HttpObjectStore {
    fn describe(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key);
        let location = self.describe(bucket, key);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CatalogLoadError::Remote {
                location: location.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_to_error(status, location));
        }

        let body = response.bytes().map_err(|e| CatalogLoadError::Remote {
            location,
            reason: format!("Failed to read body: {}", e),
        })?;

        Ok(body.to_vec())
    }
}

/// Map a non-success HTTP status to the loader's error classes
fn status_to_error(status: StatusCode, location: String) -> CatalogLoadError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            CatalogLoadError::AccessDenied { location }
        }
        StatusCode::NOT_FOUND => CatalogLoadError::NotFound { location },
        other => CatalogLoadError::Remote {
            location,
            reason: format!("HTTP {}", other),
        },
    }
}

// =============================================================================
// Local files
// =============================================================================

/// Reads `{root}/{key}`; the bucket only shows up in diagnostics
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for LocalFileStore {
    fn describe(&self, _bucket: &str, key: &str) -> String {
        self.root.join(key).display().to_string()
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(key);
        std::fs::read(&path).map_err(|e| {
            let location = self.describe(bucket, key);
            match e.kind() {
                ErrorKind::NotFound => CatalogLoadError::NotFound { location },
                ErrorKind::PermissionDenied => CatalogLoadError::AccessDenied { location },
                _ => CatalogLoadError::Io(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Credentials;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    const NO_SUCH_KEY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>";
    const ACCESS_DENIED: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>";

    /// Accept one connection, answer it with `response`, return the raw request
    fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    /// Address nothing is listening on
    fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn s3_store(endpoint: &str) -> S3ObjectStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        S3ObjectStore::from_client(S3Client::from_conf(config)).unwrap()
    }

    // ============================================================================
    // S3ObjectStore
    // ============================================================================

    #[test]
    fn test_s3_store_signs_request_and_returns_body() {
        let (url, server) = serve_once(http_response("200 OK", "text/csv", "Name\nS3\n"));
        let store = s3_store(&url);

        let bytes = store.get_object("private-bucket", "CloudLabs.csv").unwrap();
        assert_eq!(bytes, b"Name\nS3\n");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /private-bucket/CloudLabs.csv"));
        assert!(request.to_lowercase().contains("authorization: aws4-hmac-sha256"));
    }

    #[test]
    fn test_s3_store_maps_no_such_key() {
        let (url, server) = serve_once(http_response("404 Not Found", "application/xml", NO_SUCH_KEY));
        let err = s3_store(&url)
            .get_object("cloudlabs", "missing.csv")
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, CatalogLoadError::NotFound { location } if location == "s3://cloudlabs/missing.csv"));
    }

    #[test]
    fn test_s3_store_maps_access_denied() {
        let (url, server) = serve_once(http_response("403 Forbidden", "application/xml", ACCESS_DENIED));
        let err = s3_store(&url)
            .get_object("cloudlabs", "CloudLabs.csv")
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, CatalogLoadError::AccessDenied { .. }));
        assert!(err.is_access_error());
    }

    #[test]
    fn test_s3_error_code_mapping() {
        let map = |code, status| s3_error_to_catalog(code, status, "s3://b/k".into(), "boom".into());

        assert!(matches!(map(Some("NoSuchBucket"), Some(404)), CatalogLoadError::NotFound { .. }));
        assert!(matches!(map(None, Some(404)), CatalogLoadError::NotFound { .. }));
        assert!(matches!(map(Some("ExpiredToken"), Some(400)), CatalogLoadError::AccessDenied { .. }));
        assert!(matches!(map(None, Some(403)), CatalogLoadError::AccessDenied { .. }));
        assert!(matches!(
            map(Some("SlowDown"), Some(503)),
            CatalogLoadError::Remote { reason, .. } if reason == "boom"
        ));
        assert!(!map(None, None).is_access_error());
    }

    // ============================================================================
    // HttpObjectStore
    // ============================================================================

    #[test]
    fn test_object_url_is_path_style() {
        let store = HttpObjectStore::new("http://localhost:9000/");
        assert_eq!(
            store.object_url("cloudlabs", "/labs/CloudLabs.csv"),
            "http://localhost:9000/cloudlabs/labs/CloudLabs.csv"
        );
    }

    #[test]
    fn test_http_store_returns_body() {
        let (url, server) = serve_once(http_response("200 OK", "text/csv", "Name,Link\nVPC,https://x\n"));
        let bytes = HttpObjectStore::new(url)
            .get_object("cloudlabs", "CloudLabs.csv")
            .unwrap();

        assert_eq!(bytes, b"Name,Link\nVPC,https://x\n");
        assert!(server.join().unwrap().starts_with("GET /cloudlabs/CloudLabs.csv"));
    }

    #[test]
    fn test_http_store_maps_status_codes() {
        let (url, server) = serve_once(http_response("403 Forbidden", "text/plain", ""));
        let err = HttpObjectStore::new(url).get_object("b", "k").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, CatalogLoadError::AccessDenied { .. }));

        let (url, server) = serve_once(http_response("404 Not Found", "text/plain", ""));
        let err = HttpObjectStore::new(url).get_object("b", "k").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, CatalogLoadError::NotFound { .. }));

        let (url, server) = serve_once(http_response("500 Internal Server Error", "text/plain", ""));
        let err = HttpObjectStore::new(url).get_object("b", "k").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, CatalogLoadError::Remote { reason, .. } if reason.contains("500")));
    }

    #[test]
    fn test_http_store_connection_refused() {
        let err = HttpObjectStore::new(refused_url())
            .get_object("cloudlabs", "CloudLabs.csv")
            .unwrap_err();
        assert!(matches!(err, CatalogLoadError::Remote { .. }));
        assert!(!err.is_access_error());
    }

    #[test]
    fn test_http_store_truncated_body() {
        // Declares more bytes than it sends, then hangs up
        let response =
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nName\n".to_string();
        let (url, server) = serve_once(response);
        let err = HttpObjectStore::new(url).get_object("b", "k").unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, CatalogLoadError::Remote { reason, .. } if reason.starts_with("Failed to read body")));
    }

    #[test]
    fn test_status_mapping() {
        let loc = || "s3://b/k".to_string();
        assert!(matches!(
            status_to_error(StatusCode::UNAUTHORIZED, loc()),
            CatalogLoadError::AccessDenied { .. }
        ));
        let other = status_to_error(StatusCode::BAD_GATEWAY, loc());
        assert!(!other.is_access_error());
    }

    // ============================================================================
    // LocalFileStore
    // ============================================================================

    #[test]
    fn test_local_store_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CloudLabs.csv"), "Name\nS3\n").unwrap();
        let store = LocalFileStore::new(dir.path());

        let bytes = store.get_object("ignored", "CloudLabs.csv").unwrap();
        assert_eq!(bytes, b"Name\nS3\n");

        let err = store.get_object("ignored", "missing.csv").unwrap_err();
        assert!(matches!(err, CatalogLoadError::NotFound { .. }));
    }
}
