use anyhow::{Context, Result};

use davlink_lib::{BatchUploader, SyncContext};

use crate::app::{cancel_on_interrupt, App};
use crate::commands::print_batch;
use crate::OutputFormat;

pub enum Scope {
    Vault,
    Note(String),
    Folder(String),
    Attachments(String),
}

pub async fn run(app: &App, scope: Scope, format: &OutputFormat) -> Result<()> {
    let store = app.store()?;
    let ctx = SyncContext::new(&app.settings, &app.vault, &store);
    let mut uploader = BatchUploader::new(ctx).with_cancel(cancel_on_interrupt());

    let summary = match scope {
        Scope::Vault => uploader.upload_vault_files().await,
        Scope::Note(path) => {
            let note = app.find_note(&path)?;
            uploader.upload_note_files(&note).await
        }
        Scope::Folder(folder) => uploader.upload_folder_files(&folder).await,
        Scope::Attachments(folder) => uploader.upload_attachments(&folder).await,
    }
    .context("Upload failed")?;

    let log_file = uploader.create_log().await.context("Failed to write batch log")?;
    print_batch("Uploaded", &summary, uploader.results(), log_file.as_ref(), format)
}
