use std::sync::Arc;

use serde::Serialize;

use super::client::{WebDAVClient, WebDAVError};
use super::transport::HttpTransport;
use crate::link::FilePayload;
use crate::settings::Settings;

/// Multi-Status, the expected answer to PROPFIND
const MULTI_STATUS: u16 = 207;

/// Where an uploaded file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub url: String,
}

/// Remote attachment store addressed by absolute URLs
pub struct RemoteStore {
    client: WebDAVClient,
}

impl RemoteStore {
    pub fn new(client: WebDAVClient) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &Settings, transport: Arc<dyn HttpTransport>) -> Result<Self, WebDAVError> {
        let client = WebDAVClient::new(&settings.url, settings.credentials(), transport)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &WebDAVClient {
        &self.client
    }

    /// Absolute URL of a remote path
    pub fn url_for(&self, path: &str) -> String {
        self.client.url(path)
    }

    /// Remote path of a URL on this server. Link targets arrive already
    /// percent-decoded, so the remainder is used as is.
    pub fn path_for(&self, url: &str) -> String {
        let path = url.strip_prefix(self.client.base_url()).unwrap_or(url);
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    pub async fn upload(&self, payload: &FilePayload, path: &str) -> Result<FileInfo, WebDAVError> {
        self.client.put_file_contents(path, &payload.bytes).await?;

        Ok(FileInfo {
            file_name: payload.name.clone(),
            url: self.url_for(path),
        })
    }

    /// Fetch a file, returning its remote name with the bytes
    pub async fn download(&self, url: &str) -> Result<(String, Vec<u8>), WebDAVError> {
        let path = self.path_for(url);
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let bytes = self.client.get_file_contents(&path).await?;
        Ok((file_name, bytes))
    }

    pub async fn delete(&self, url: &str) -> Result<(), WebDAVError> {
        self.client.delete_file(&self.path_for(url)).await
    }

    /// Move a file to `new_path` and return its new URL
    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<String, WebDAVError> {
        let new_path = if new_path.starts_with('/') {
            new_path.to_string()
        } else {
            format!("/{}", new_path)
        };
        self.client.move_file(old_path, &new_path).await?;
        Ok(self.url_for(&new_path))
    }

    /// Probe the server root. `None` means the server answered as expected,
    /// anything else is a diagnostic for the user.
    pub async fn test_connection(&self) -> Option<String> {
        match self.client.custom_request("PROPFIND", "/", &[("Depth", "0")], None).await {
            Ok(response) if response.status == MULTI_STATUS => None,
            Ok(response) => Some(format!("Check connection failed: {}", response.status)),
            Err(e) => Some(e.to_string()),
        }
    }
}
