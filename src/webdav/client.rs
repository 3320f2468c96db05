use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use super::transport::{HttpRequest, HttpResponse, HttpTransport};

#[derive(Error, Debug)]
pub enum WebDAVError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebDAV request failed: {status} {message}")]
    Status { status: u16, message: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebDAVError {
    /// Status code of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

const CONFLICT: u16 = 409;
const METHOD_NOT_ALLOWED: u16 = 405;

/// Minimal WebDAV client
pub struct WebDAVClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    auth_header: Option<String>,
}

/// Percent-encode every segment of a `/`-separated path
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl WebDAVClient {
    /// Create a client for `base_url`. Credentials are sent as Basic auth on
    /// every request when given.
    pub fn new(
        base_url: &str,
        credentials: Option<(&str, &str)>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, WebDAVError> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(WebDAVError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let auth_header = credentials.map(|(username, password)| {
            format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
        });

        Ok(Self {
            transport,
            base_url,
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a path, encoding each segment
    pub fn url(&self, path: &str) -> String {
        let encoded = encode_path(path);
        if encoded.starts_with('/') {
            format!("{}{}", self.base_url, encoded)
        } else {
            format!("{}/{}", self.base_url, encoded)
        }
    }

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, WebDAVError> {
        let request = match &self.auth_header {
            Some(auth) => request.header("Authorization", auth.clone()),
            None => request,
        };
        log::debug!("{} {}", request.method, request.url);

        let response = self.transport.send(request).await?;
        if response.status >= 400 {
            return Err(WebDAVError::Status {
                status: response.status,
                message: response.text(),
            });
        }
        Ok(response)
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<(), WebDAVError> {
        let request = HttpRequest::new("PUT", self.url(path))
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec());
        self.request(request).await?;
        Ok(())
    }

    /// PUT - Upload file contents, creating missing parent collections once
    pub async fn put_file_contents(&self, path: &str, data: &[u8]) -> Result<(), WebDAVError> {
        match self.put(path, data).await {
            Err(e) if e.status() == Some(CONFLICT) => {
                log::info!("Parent of '{}' is missing, creating it", path);
                self.ensure_directory_exists(parent_path(path)).await?;
                self.put(path, data).await
            }
            result => result,
        }
    }

    /// GET - Download file contents
    pub async fn get_file_contents(&self, path: &str) -> Result<Vec<u8>, WebDAVError> {
        let response = self.request(HttpRequest::new("GET", self.url(path))).await?;
        Ok(response.body)
    }

    /// DELETE - Remove a file
    pub async fn delete_file(&self, path: &str) -> Result<(), WebDAVError> {
        self.request(HttpRequest::new("DELETE", self.url(path))).await?;
        Ok(())
    }

    async fn move_once(&self, from: &str, to: &str) -> Result<(), WebDAVError> {
        let request = HttpRequest::new("MOVE", self.url(from))
            .header("Destination", self.url(to))
            .header("Overwrite", "F");
        self.request(request).await?;
        Ok(())
    }

    /// MOVE - Rename a file on the server, creating the target's parent
    /// collections once if the server reports them missing
    pub async fn move_file(&self, from: &str, to: &str) -> Result<(), WebDAVError> {
        match self.move_once(from, to).await {
            Err(e) if e.status() == Some(CONFLICT) => {
                self.ensure_directory_exists(parent_path(to)).await?;
                self.move_once(from, to).await
            }
            result => result,
        }
    }

    /// MKCOL - Create a directory
    pub async fn create_directory(&self, path: &str) -> Result<(), WebDAVError> {
        self.request(HttpRequest::new("MKCOL", self.url(path))).await?;
        Ok(())
    }

    /// Create every ancestor collection of `path`, outermost first
    pub async fn ensure_directory_exists(&self, path: &str) -> Result<(), WebDAVError> {
        let mut current = String::new();
        for dir in path.split('/').filter(|dir| !dir.is_empty()) {
            current.push('/');
            current.push_str(dir);

            match self.create_directory(&current).await {
                Ok(()) => {}
                // Servers disagree on what an existing collection returns
                Err(e) if matches!(e.status(), Some(METHOD_NOT_ALLOWED | CONFLICT)) => {
                    log::warn!("Directory already exists or cannot be created: {}", current);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Issue an arbitrary request against `path`
    pub async fn custom_request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, WebDAVError> {
        let mut request = HttpRequest::new(method, self.url(path));
        for (name, value) in headers {
            request = request.header(name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        self.request(request).await
    }
}

fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDav;

    const BASE: &str = "https://dav.example.com/files";

    fn client(server: &Arc<FakeDav>, credentials: Option<(&str, &str)>) -> WebDAVClient {
        WebDAVClient::new(&format!("{}/", BASE), credentials, server.clone()).unwrap()
    }

    #[test]
    fn test_rejects_non_http_url() {
        let server = Arc::new(FakeDav::new(BASE));
        assert!(matches!(
            WebDAVClient::new("dav.example.com", None, server),
            Err(WebDAVError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_encodes_segments() {
        let server = Arc::new(FakeDav::new(BASE));
        let client = client(&server, None);
        assert_eq!(client.base_url(), BASE);
        assert_eq!(client.url("/a b/c#d.png"), format!("{}/a%20b/c%23d.png", BASE));
        assert_eq!(client.url("x.png"), format!("{}/x.png", BASE));
    }

    #[tokio::test]
    async fn test_auth_header_only_with_credentials() {
        let server = Arc::new(FakeDav::new(BASE));
        client(&server, Some(("user", "pass"))).put_file_contents("/a.png", b"a").await.unwrap();
        client(&server, None).put_file_contents("/b.png", b"b").await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].header_value("authorization"), Some("Basic dXNlcjpwYXNz"));
        assert_eq!(requests[0].header_value("content-type"), Some("application/octet-stream"));
        assert_eq!(requests[1].header_value("authorization"), None);
    }

    #[tokio::test]
    async fn test_put_creates_missing_parents_and_retries_once() {
        let server = Arc::new(FakeDav::new(BASE));
        server.require_directories();
        let client = client(&server, None);

        client.put_file_contents("/2024/05/photo.png", b"png").await.unwrap();

        assert_eq!(server.get("/2024/05/photo.png"), Some(b"png".to_vec()));
        let methods: Vec<String> = server.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec!["PUT", "MKCOL", "MKCOL", "PUT"]);
    }

    #[tokio::test]
    async fn test_existing_directories_are_tolerated() {
        let server = Arc::new(FakeDav::new(BASE));
        server.require_directories();
        server.insert_dir("/2024");
        let client = client(&server, None);

        client.put_file_contents("/2024/05/photo.png", b"png").await.unwrap();
        assert!(server.contains("/2024/05/photo.png"));
    }

    #[tokio::test]
    async fn test_second_conflict_propagates() {
        let server = Arc::new(FakeDav::new(BASE));
        server.respond_next("PUT", 409);
        server.respond_next("PUT", 409);
        let client = client(&server, None);

        let err = client.put_file_contents("/a/b.png", b"x").await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(server.count("PUT"), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let server = Arc::new(FakeDav::new(BASE));
        server.respond_next("PUT", 403);
        let client = client(&server, None);

        let err = client.put_file_contents("/a.png", b"x").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(server.count("PUT"), 1);
        assert_eq!(server.count("MKCOL"), 0);
    }

    #[tokio::test]
    async fn test_get_missing_file_is_an_error() {
        let server = Arc::new(FakeDav::new(BASE));
        let client = client(&server, None);
        let err = client.get_file_contents("/nope.png").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_move_sends_destination() {
        let server = Arc::new(FakeDav::new(BASE));
        server.insert("/a b.png", b"x");
        let client = client(&server, None);

        client.move_file("/a b.png", "/c.png").await.unwrap();

        let request = server.requests().pop().unwrap();
        assert_eq!(request.url, format!("{}/a%20b.png", BASE));
        assert_eq!(request.header_value("destination"), Some(format!("{}/c.png", BASE).as_str()));
        assert!(server.contains("/c.png"));
        assert!(!server.contains("/a b.png"));
    }
}
