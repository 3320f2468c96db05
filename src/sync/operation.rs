//! Single-link sync operations.

use std::collections::{HashMap, HashSet};

use crate::link::{DownloadFileInfo, Link, LinkError, UploadFileInfo};
use crate::settings::UploadedFileOperation;
use crate::vault::{self, VaultFile};
use crate::webdav::FileInfo;

use super::SyncContext;

/// Files already pushed during one batch, keyed by vault path
#[derive(Debug, Default)]
pub struct UploadCache {
    uploaded: HashMap<String, FileInfo>,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&FileInfo> {
        self.uploaded.get(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, info: FileInfo) {
        self.uploaded.insert(path.into(), info);
    }

    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}

/// A link upload within a batch
#[derive(Debug, Clone)]
pub struct CachedUpload {
    pub info: UploadFileInfo,
    /// The vault file that was uploaded
    pub file: VaultFile,
    /// Whether this call performed the transfer
    pub transferred: bool,
}

/// Upload a local link's file unless the batch has already done so, then
/// render the replacement text for `note`.
///
/// Returns `None` for links the batch should leave alone: placeholder PDFs and,
/// when `only` is given, files outside that set.
pub async fn upload_cached(
    ctx: &SyncContext<'_>,
    cache: &mut UploadCache,
    link: &mut Link,
    note: &VaultFile,
    only: Option<&HashSet<String>>,
) -> Result<Option<CachedUpload>, LinkError> {
    link.init(ctx, note).await?;
    if link.is_dummy_pdf() == Some(true) {
        log::debug!("Skipping placeholder '{}'", link.describe());
        return Ok(None);
    }

    let file = link.local_file(ctx.vault, &note.path)?.clone();
    if only.is_some_and(|only| !only.contains(&file.path)) {
        return Ok(None);
    }

    let (file_info, transferred) = match cache.get(&file.path) {
        Some(info) => {
            log::debug!("'{}' already uploaded to '{}'", file.path, info.url);
            (info.clone(), false)
        }
        None => {
            let info = link.transfer(ctx, note).await?;
            cache.insert(file.path.clone(), info.clone());
            (info, true)
        }
    };
    let markdown_link = link.render_upload(ctx, note, &file_info).await?;

    Ok(Some(CachedUpload {
        info: UploadFileInfo {
            file_name: file_info.file_name,
            url: file_info.url,
            markdown_link,
        },
        file,
        transferred,
    }))
}

/// A single-link upload and what became of its local file
#[derive(Debug, Clone)]
pub struct SingleUpload {
    pub info: UploadFileInfo,
    /// Set when the upload went through but the local file could not be disposed of
    pub delete_error: Option<String>,
}

/// Upload one link and dispose of its local file right away
pub async fn upload(ctx: &SyncContext<'_>, link: &mut Link, note: &VaultFile) -> Result<SingleUpload, LinkError> {
    let info = link.upload(ctx, note).await?;

    let mut delete_error = None;
    if let Ok(file) = link.local_file(ctx.vault, &note.path) {
        let file = file.clone();
        if let Err(e) = dispose_local_file(ctx, &file).await {
            let error = format!("Failed to delete local file '{}', {}", file.path, e);
            log::error!("{}", error);
            delete_error = Some(error);
        }
    }
    Ok(SingleUpload { info, delete_error })
}

pub async fn download(ctx: &SyncContext<'_>, link: &mut Link, note: &VaultFile) -> Result<DownloadFileInfo, LinkError> {
    link.init(ctx, note).await?;
    link.download(ctx, note).await
}

pub async fn delete(ctx: &SyncContext<'_>, link: &mut Link, note: &VaultFile) -> Result<(), LinkError> {
    link.init(ctx, note).await?;
    link.delete(ctx, note).await
}

/// Move the remote file to `new_path` and return the rewritten link text
pub async fn rename(
    ctx: &SyncContext<'_>,
    link: &mut Link,
    note: &VaultFile,
    raw: &str,
    new_path: &str,
) -> Result<String, LinkError> {
    let new_path = new_path.trim();
    if new_path.is_empty() {
        return Err(LinkError::InvalidRename("path is empty".to_string()));
    }

    link.init(ctx, note).await?;
    let old_url = link.describe().to_string();
    if ctx.store.path_for(&old_url) == new_path || old_url == ctx.store.url_for(new_path) {
        return Err(LinkError::InvalidRename("path is unchanged".to_string()));
    }

    let is_placeholder = link.is_dummy_pdf() == Some(true);
    let new_url = link.rename(ctx, note, new_path).await?;
    if is_placeholder {
        // The link points at the placeholder, which now holds the new URL
        return Ok(raw.to_string());
    }

    Ok(replace_target(raw, &old_url, &new_url))
}

/// Swap the URL inside link text, whether it appears decoded or encoded
fn replace_target(raw: &str, old_url: &str, new_url: &str) -> String {
    if raw.contains(old_url) {
        return raw.replacen(old_url, new_url, 1);
    }
    let encoded = old_url.replace(' ', "%20");
    if raw.contains(&encoded) {
        return raw.replacen(&encoded, new_url, 1);
    }
    raw.to_string()
}

/// Apply the configured disposition to an uploaded local file
pub async fn dispose_local_file(ctx: &SyncContext<'_>, file: &VaultFile) -> vault::Result<()> {
    match ctx.settings.uploaded_file_operation {
        UploadedFileOperation::Trash => {
            log::info!("Moving '{}' to trash", file.path);
            ctx.vault.trash(file).await
        }
        UploadedFileOperation::Delete => {
            log::info!("Deleting '{}'", file.path);
            ctx.vault.delete(file).await
        }
        UploadedFileOperation::None => Ok(()),
    }
}
