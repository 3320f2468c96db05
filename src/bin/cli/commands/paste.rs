use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use davlink_lib::link::FilePayload;
use davlink_lib::sync::actions::upload_payload;
use davlink_lib::vault::Vault;
use davlink_lib::SyncContext;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, note_path: &str, file: &Path, format: &OutputFormat) -> Result<()> {
    let note = app.find_note(note_path)?;

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("File has no name")?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mtime: DateTime<Utc> = tokio::fs::metadata(file)
        .await
        .and_then(|meta| meta.modified())
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());

    let store = app.store()?;
    let ctx = SyncContext::new(&app.settings, &app.vault, &store);
    let Some(link) = upload_payload(&ctx, &note, FilePayload::new(name.as_str(), bytes, mtime)).await? else {
        bail!("'{}' was not uploaded: uploads are disabled or its extension is not included", name);
    };

    let mut content = app.vault.read(&note).await.context("Failed to read note")?;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&link);
    content.push('\n');
    app.vault
        .modify(&note, &content, None)
        .await
        .context("Failed to save note")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "note": note.path,
                "file": name,
                "link": link,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Appended {} to {}", link, note.path);
        }
    }
    Ok(())
}
