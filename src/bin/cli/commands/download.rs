use anyhow::{Context, Result};

use davlink_lib::{BatchDownloader, SyncContext};

use crate::app::{cancel_on_interrupt, App};
use crate::commands::print_batch;
use crate::OutputFormat;

pub enum Scope {
    Vault,
    Note(String),
    Folder(String),
}

pub async fn run(app: &App, scope: Scope, format: &OutputFormat) -> Result<()> {
    let store = app.store()?;
    let ctx = SyncContext::new(&app.settings, &app.vault, &store);
    let mut downloader = BatchDownloader::new(ctx).with_cancel(cancel_on_interrupt());

    let summary = match scope {
        Scope::Vault => downloader.download_vault_files().await,
        Scope::Note(path) => {
            let note = app.find_note(&path)?;
            downloader.download_note_files(&note).await
        }
        Scope::Folder(folder) => downloader.download_folder_files(&folder).await,
    }
    .context("Download failed")?;

    let log_file = downloader.create_log().await.context("Failed to write batch log")?;
    print_batch("Downloaded", &summary, downloader.results(), log_file.as_ref(), format)
}
