//! Link synchronization.
//!
//! [`operation`] moves a single link's file to or from the server,
//! [`BatchUploader`] and [`BatchDownloader`] run those operations over whole
//! notes, folders or the vault and rewrite the note text, and [`actions`]
//! covers edits driven by the cursor position or a pasted file.

pub mod actions;
mod batch;
pub mod operation;
mod report;

use serde::Serialize;
use thiserror::Error;

use crate::link::{LinkError, LinkInfo};
use crate::settings::Settings;
use crate::vault::{Vault, VaultError, VaultFile};
use crate::webdav::RemoteStore;

pub use batch::{BatchDownloader, BatchSummary, BatchUploader, DeleteError};
pub use report::{render_log, write_log, LOG_FILE_PREFIX};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
    #[error("Note not found: '{0}'")]
    NoteNotFound(String),
    #[error("Line {0} is out of range")]
    LineOutOfRange(usize),
    #[error("No link at line {line}, column {column}")]
    NoLinkAtCursor { line: usize, column: usize },
}

/// Everything a sync operation needs, borrowed for its duration
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub settings: &'a Settings,
    pub vault: &'a dyn Vault,
    pub store: &'a RemoteStore,
}

impl<'a> SyncContext<'a> {
    pub fn new(settings: &'a Settings, vault: &'a dyn Vault, store: &'a RemoteStore) -> Self {
        Self {
            settings,
            vault,
            store,
        }
    }
}

/// Outcome of one link in a batch run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProcessFileResult {
    pub success: bool,
    pub note: VaultFile,
    pub link: LinkInfo,
    /// Remote URL after an upload, vault path after a download
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchProcessFileResult {
    pub fn succeeded(note: &VaultFile, link: LinkInfo, new_link: impl Into<String>) -> Self {
        Self {
            success: true,
            note: note.clone(),
            link,
            new_link: Some(new_link.into()),
            message: None,
        }
    }

    pub fn failed(note: &VaultFile, link: LinkInfo, message: impl Into<String>) -> Self {
        Self {
            success: false,
            note: note.clone(),
            link,
            new_link: None,
            message: Some(message.into()),
        }
    }
}
