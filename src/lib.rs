//! Attachment link rewriting and WebDAV synchronization for markdown vaults.
//!
//! Notes reference attachments through markdown (`[name](path)`) or wiki
//! (`[[path|name]]`) links. This crate finds those links, moves the referenced
//! files to or from a WebDAV server and rewrites the note text so every link
//! points at the new location.

pub mod editor;
pub mod format;
pub mod link;
pub mod settings;
pub mod sync;
pub mod vault;
pub mod webdav;

#[cfg(test)]
mod test_support;

pub use link::{create_link, match_links, FileType, Link, LinkData, LinkError, LinkInfo};
pub use settings::{Settings, SettingsError, UploadedFileOperation};
pub use sync::{BatchDownloader, BatchProcessFileResult, BatchSummary, BatchUploader, SyncContext, SyncError};
pub use vault::{FsVault, Vault, VaultError, VaultFile};
pub use webdav::{HttpTransport, RemoteStore, ReqwestTransport, WebDAVClient, WebDAVError};
