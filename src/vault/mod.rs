//! Local note store.
//!
//! The sync core only talks to the vault through the [`Vault`] trait so it can
//! run against a plain directory ([`FsVault`]) or any other host store.

mod fs_vault;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use fs_vault::FsVault;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: '{0}'")]
    NotFound(String),
    #[error("File already exists: '{0}'")]
    AlreadyExists(String),
    #[error("Path escapes the vault: '{0}'")]
    OutsideVault(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Timestamps and size of a vault file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStat {
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub size: u64,
}

/// A file inside the vault, addressed by its vault-relative `/`-separated path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultFile {
    pub path: String,
    pub stat: FileStat,
}

impl VaultFile {
    pub fn new(path: impl Into<String>, stat: FileStat) -> Self {
        Self { path: path.into(), stat }
    }

    /// File name with extension
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without extension
    pub fn basename(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Lowercase extension without the dot
    pub fn extension(&self) -> String {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => name[idx + 1..].to_lowercase(),
            _ => String::new(),
        }
    }

    /// Folder containing the file, empty for the vault root
    pub fn parent(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension() == "md"
    }
}

/// Host file store used by the sync core
#[async_trait]
pub trait Vault: Send + Sync {
    /// Every markdown note in the vault
    fn markdown_files(&self) -> Result<Vec<VaultFile>>;

    /// Markdown notes under `folder`, recursively
    fn markdown_files_in(&self, folder: &str) -> Result<Vec<VaultFile>>;

    /// Files (not folders) directly inside `folder`
    fn folder_files(&self, folder: &str) -> Result<Vec<VaultFile>>;

    /// Look up a file by exact vault-relative path
    fn file(&self, path: &str) -> Result<Option<VaultFile>>;

    /// Resolve link text the way the editor would from `source_path`
    fn resolve_link(&self, link_path: &str, source_path: &str) -> Option<VaultFile>;

    /// Link text pointing at `file`, without any embed `!` prefix
    fn generate_link(&self, file: &VaultFile) -> String;

    async fn read(&self, file: &VaultFile) -> Result<String>;

    async fn read_binary(&self, file: &VaultFile) -> Result<Vec<u8>>;

    async fn create(&self, path: &str, content: &str) -> Result<VaultFile>;

    async fn create_binary(&self, path: &str, data: &[u8]) -> Result<VaultFile>;

    /// Replace note content. When `stat` is given its mtime is written back so
    /// the change does not look like a fresh edit.
    async fn modify(&self, file: &VaultFile, content: &str, stat: Option<&FileStat>) -> Result<()>;

    /// Remove a file permanently
    async fn delete(&self, file: &VaultFile) -> Result<()>;

    /// Move a file into the vault trash
    async fn trash(&self, file: &VaultFile) -> Result<()>;

    /// Free path for a new attachment named `file_name` belonging to `source_path`
    async fn available_attachment_path(&self, file_name: &str, source_path: &str) -> Result<String>;

    /// Notes whose links resolve to `attachment`
    async fn referencing_notes(&self, attachment: &VaultFile) -> Result<Vec<VaultFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> VaultFile {
        let now = Utc::now();
        VaultFile::new(path, FileStat { ctime: now, mtime: now, size: 0 })
    }

    #[test]
    fn test_name_parts() {
        let f = file("assets/img/Photo.Large.PNG");
        assert_eq!(f.name(), "Photo.Large.PNG");
        assert_eq!(f.basename(), "Photo.Large");
        assert_eq!(f.extension(), "png");
        assert_eq!(f.parent(), "assets/img");
    }

    #[test]
    fn test_root_file_without_extension() {
        let f = file(".hidden");
        assert_eq!(f.basename(), ".hidden");
        assert_eq!(f.extension(), "");
        assert_eq!(f.parent(), "");
        assert!(!f.is_markdown());
    }
}
