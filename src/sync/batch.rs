//! Batch upload and download over notes, folders and the whole vault.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::operation::{self, UploadCache};
use super::report;
use super::{BatchProcessFileResult, SyncContext, SyncError};
use crate::link::{create_link, match_links, splice, FileType, LinkInfo, LinkType};
use crate::settings::Settings;
use crate::vault::VaultFile;

/// Aggregate counts for the end-of-batch notice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub delete_failures: usize,
}

impl BatchSummary {
    fn of(results: &[BatchProcessFileResult], delete_failures: usize) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
            delete_failures,
        }
    }
}

/// A local file that could not be disposed of after upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteError {
    pub file: String,
    pub error: String,
}

fn is_cancelled(cancel: &Option<Arc<AtomicBool>>) -> bool {
    cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Uploads every local attachment link in a set of notes
pub struct BatchUploader<'a> {
    ctx: SyncContext<'a>,
    cache: UploadCache,
    /// Uploaded files awaiting disposal, in upload order
    uploaded: Vec<VaultFile>,
    results: Vec<BatchProcessFileResult>,
    delete_errors: Vec<DeleteError>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> BatchUploader<'a> {
    pub fn new(ctx: SyncContext<'a>) -> Self {
        Self {
            ctx,
            cache: UploadCache::new(),
            uploaded: Vec::new(),
            results: Vec::new(),
            delete_errors: Vec::new(),
            cancel: None,
        }
    }

    /// Stop between links once `flag` is set
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn results(&self) -> &[BatchProcessFileResult] {
        &self.results
    }

    pub fn delete_errors(&self) -> &[DeleteError] {
        &self.delete_errors
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::of(&self.results, self.delete_errors.len())
    }

    pub async fn upload_vault_files(&mut self) -> Result<BatchSummary, SyncError> {
        let notes = self.ctx.vault.markdown_files()?;
        self.upload_notes(notes).await
    }

    /// Notes anywhere below `folder`
    pub async fn upload_folder_files(&mut self, folder: &str) -> Result<BatchSummary, SyncError> {
        let notes = self.ctx.vault.markdown_files_in(folder)?;
        self.upload_notes(notes).await
    }

    pub async fn upload_note_files(&mut self, note: &VaultFile) -> Result<BatchSummary, SyncError> {
        self.process_note(note, None).await?;
        self.dispose_uploaded().await;
        Ok(self.summary())
    }

    /// The direct attachment children of `folder`, rewritten in every note
    /// that references them
    pub async fn upload_attachments(&mut self, folder: &str) -> Result<BatchSummary, SyncError> {
        let ctx = self.ctx;
        let attachments: Vec<VaultFile> = ctx
            .vault
            .folder_files(folder)?
            .into_iter()
            .filter(|file| !file.is_markdown() && !ctx.settings.is_excluded(&file.path))
            .collect();

        let mut by_note: BTreeMap<String, (VaultFile, HashSet<String>)> = BTreeMap::new();
        for attachment in &attachments {
            for note in ctx.vault.referencing_notes(attachment).await? {
                by_note
                    .entry(note.path.clone())
                    .or_insert_with(|| (note, HashSet::new()))
                    .1
                    .insert(attachment.path.clone());
            }
        }

        let total = by_note.len();
        for (count, (note, only)) in by_note.into_values().enumerate() {
            if is_cancelled(&self.cancel) {
                log::warn!("Upload cancelled");
                break;
            }
            log::info!("Uploading attachments in '{}' ({}/{})", note.path, count + 1, total);
            if let Err(e) = self.process_note(&note, Some(&only)).await {
                log::error!("Failed to upload files from '{}', {}", note.path, e);
            }
        }
        log::info!("All files uploaded");

        self.dispose_uploaded().await;
        Ok(self.summary())
    }

    async fn upload_notes(&mut self, notes: Vec<VaultFile>) -> Result<BatchSummary, SyncError> {
        let total = notes.len();
        for (count, note) in notes.iter().enumerate() {
            if is_cancelled(&self.cancel) {
                log::warn!("Upload cancelled");
                break;
            }
            log::info!("Uploading files in '{}' ({}/{})", note.path, count + 1, total);
            if let Err(e) = self.process_note(note, None).await {
                log::error!("Failed to upload files from '{}', {}", note.path, e);
            }
        }
        log::info!("All files uploaded");

        self.dispose_uploaded().await;
        Ok(self.summary())
    }

    async fn process_note(&mut self, note: &VaultFile, only: Option<&HashSet<String>>) -> Result<(), SyncError> {
        let ctx = self.ctx;
        let content = ctx.vault.read(note).await?;
        let links: Vec<LinkInfo> = match_links(&content)
            .into_iter()
            .filter(|link| is_upload_candidate(ctx.settings, link))
            .collect();
        if links.is_empty() {
            return Ok(());
        }

        // Offsets stay valid because links arrive last-first
        let mut new_content = content.clone();
        for info in links {
            if is_cancelled(&self.cancel) {
                break;
            }

            let mut link = create_link(ctx.settings, info.clone());
            match operation::upload_cached(&ctx, &mut self.cache, &mut link, note, only).await {
                Ok(Some(upload)) => {
                    new_content = splice(&new_content, &info, &upload.info.markdown_link);
                    if !self.uploaded.iter().any(|file| file.path == upload.file.path) {
                        self.uploaded.push(upload.file);
                    }
                    self.results
                        .push(BatchProcessFileResult::succeeded(note, info, upload.info.url));
                }
                Ok(None) => {}
                Err(e) => {
                    let message = format!("Failed to upload file '{}' from {}, {}", info.path, note.path, e);
                    log::error!("{}", message);
                    self.results.push(BatchProcessFileResult::failed(note, info, message));
                }
            }
        }

        if new_content != content {
            ctx.vault.modify(note, &new_content, Some(&note.stat)).await?;
        }
        Ok(())
    }

    async fn dispose_uploaded(&mut self) {
        let ctx = self.ctx;
        for file in std::mem::take(&mut self.uploaded) {
            if let Err(e) = operation::dispose_local_file(&ctx, &file).await {
                let error = format!("Failed to delete local file '{}', {}", file.path, e);
                log::error!("{}", error);
                self.delete_errors.push(DeleteError { file: file.path, error });
            }
        }
    }

    /// Write the log note when enabled
    pub async fn create_log(&self) -> Result<Option<VaultFile>, SyncError> {
        if !self.ctx.settings.create_batch_log {
            return Ok(None);
        }
        let file = report::write_log(self.ctx.vault, &self.results, Some(self.delete_errors.as_slice())).await?;
        Ok(Some(file))
    }
}

fn is_upload_candidate(settings: &Settings, link: &LinkInfo) -> bool {
    !settings.is_excluded(&link.path) && LinkType::of_path(&link.path) == LinkType::Local
}

/// Downloads every remote attachment link in a set of notes
pub struct BatchDownloader<'a> {
    ctx: SyncContext<'a>,
    results: Vec<BatchProcessFileResult>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> BatchDownloader<'a> {
    pub fn new(ctx: SyncContext<'a>) -> Self {
        Self {
            ctx,
            results: Vec::new(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn results(&self) -> &[BatchProcessFileResult] {
        &self.results
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::of(&self.results, 0)
    }

    pub async fn download_vault_files(&mut self) -> Result<BatchSummary, SyncError> {
        let notes = self.ctx.vault.markdown_files()?;
        self.download_notes(notes).await
    }

    pub async fn download_folder_files(&mut self, folder: &str) -> Result<BatchSummary, SyncError> {
        let notes = self.ctx.vault.markdown_files_in(folder)?;
        self.download_notes(notes).await
    }

    pub async fn download_note_files(&mut self, note: &VaultFile) -> Result<BatchSummary, SyncError> {
        self.process_note(note).await?;
        Ok(self.summary())
    }

    async fn download_notes(&mut self, notes: Vec<VaultFile>) -> Result<BatchSummary, SyncError> {
        let total = notes.len();
        for (count, note) in notes.iter().enumerate() {
            if is_cancelled(&self.cancel) {
                log::warn!("Download cancelled");
                break;
            }
            log::info!("Downloading files in '{}' ({}/{})", note.path, count + 1, total);
            if let Err(e) = self.process_note(note).await {
                log::error!("Failed to download files from '{}', {}", note.path, e);
            }
        }
        log::info!("All files downloaded");

        Ok(self.summary())
    }

    async fn process_note(&mut self, note: &VaultFile) -> Result<(), SyncError> {
        let ctx = self.ctx;
        let content = ctx.vault.read(note).await?;
        let links: Vec<LinkInfo> = match_links(&content)
            .into_iter()
            .filter(|link| is_download_candidate(ctx.settings, link))
            .collect();
        if links.is_empty() {
            return Ok(());
        }

        let mut new_content = content.clone();
        for info in links {
            if is_cancelled(&self.cancel) {
                break;
            }

            let mut link = create_link(ctx.settings, info.clone());
            if link.link_type() == LinkType::Local {
                // Only placeholder PDFs are downloadable among local links
                match link.init(&ctx, note).await {
                    Ok(()) if !link.downloadable() => continue,
                    Ok(()) => {}
                    Err(e) => {
                        let message = format!("Failed to download file '{}' from {}, {}", info.path, note.path, e);
                        log::error!("{}", message);
                        self.results.push(BatchProcessFileResult::failed(note, info, message));
                        continue;
                    }
                }
            }

            match operation::download(&ctx, &mut link, note).await {
                Ok(downloaded) => {
                    new_content = splice(&new_content, &info, &downloaded.markdown_link);
                    self.results
                        .push(BatchProcessFileResult::succeeded(note, info, downloaded.file.path));
                }
                Err(e) => {
                    let message = format!("Failed to download file '{}' from {}, {}", info.path, note.path, e);
                    log::error!("{}", message);
                    self.results.push(BatchProcessFileResult::failed(note, info, message));
                }
            }
        }

        if new_content != content {
            ctx.vault.modify(note, &new_content, Some(&note.stat)).await?;
        }
        Ok(())
    }

    pub async fn create_log(&self) -> Result<Option<VaultFile>, SyncError> {
        if !self.ctx.settings.create_batch_log {
            return Ok(None);
        }
        let file = report::write_log(self.ctx.vault, &self.results, None).await?;
        Ok(Some(file))
    }
}

fn is_download_candidate(settings: &Settings, link: &LinkInfo) -> bool {
    if settings.is_excluded(&link.path) {
        return false;
    }
    if settings.is_webdav_url(&link.path) {
        return true;
    }
    settings.enable_dummy_pdf
        && LinkType::of_path(&link.path) == LinkType::Local
        && FileType::from_name(&link.path) == FileType::Pdf
}
