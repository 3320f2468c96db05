use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::parser::LinkInfo;
use crate::vault::{VaultError, VaultFile};
use crate::webdav::WebDAVError;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Cannot upload '{0}'")]
    NotUploadable(String),
    #[error("File is not downloadable: '{0}'")]
    NotDownloadable(String),
    #[error("File not found: '{0}'")]
    NotFound(String),
    #[error("Pasted file '{0}' has no vault counterpart")]
    NoVaultFile(String),
    #[error("Invalid rename target: {0}")]
    InvalidRename(String),
    #[error(transparent)]
    WebDAV(#[from] WebDAVError),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Coarse file classification by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Md,
    Pdf,
    Image,
    Attachment,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp", "bmp", "ico"];

impl FileType {
    pub fn from_name(name: &str) -> Self {
        let name = name.rsplit('/').next().unwrap_or(name);
        let extension = match name.rfind('.') {
            Some(idx) => name[idx + 1..].to_lowercase(),
            None => return Self::Attachment,
        };

        match extension.as_str() {
            "md" => Self::Md,
            "pdf" => Self::Pdf,
            ext if IMAGE_EXTENSIONS.contains(&ext) => Self::Image,
            _ => Self::Attachment,
        }
    }
}

/// Whether a link target lives in the vault or on a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Local,
    External,
}

impl LinkType {
    pub fn of_path(path: &str) -> Self {
        if path.starts_with("http://") || path.starts_with("https://") {
            Self::External
        } else {
            Self::Local
        }
    }
}

/// A file that was pasted or dropped and exists only in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mtime: DateTime<Utc>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mtime: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mtime,
        }
    }
}

/// What a [`Link`](super::Link) wraps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkData {
    Info(LinkInfo),
    Payload(FilePayload),
}

impl LinkData {
    /// The link target, or the payload's file name
    pub fn target(&self) -> &str {
        match self {
            Self::Info(info) => &info.path,
            Self::Payload(payload) => &payload.name,
        }
    }
}

impl From<LinkInfo> for LinkData {
    fn from(info: LinkInfo) -> Self {
        Self::Info(info)
    }
}

impl From<FilePayload> for LinkData {
    fn from(payload: FilePayload) -> Self {
        Self::Payload(payload)
    }
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileInfo {
    pub file_name: String,
    pub url: String,
    /// Link text to put in place of the original link
    pub markdown_link: String,
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileInfo {
    pub file: VaultFile,
    pub markdown_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_name() {
        assert_eq!(FileType::from_name("note.md"), FileType::Md);
        assert_eq!(FileType::from_name("docs/paper.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_name("a/b/photo.jpeg"), FileType::Image);
        assert_eq!(FileType::from_name("icon.ico"), FileType::Image);
        assert_eq!(FileType::from_name("archive.zip"), FileType::Attachment);
        assert_eq!(FileType::from_name("folder.v2/README"), FileType::Attachment);
        assert_eq!(FileType::from_name("https://dav.example.com/x.png"), FileType::Image);
    }

    #[test]
    fn test_link_type_of_path() {
        assert_eq!(LinkType::of_path("https://dav.example.com/a.png"), LinkType::External);
        assert_eq!(LinkType::of_path("http://dav.example.com/a.png"), LinkType::External);
        assert_eq!(LinkType::of_path("assets/a.png"), LinkType::Local);
    }
}
