use anyhow::{bail, Context, Result};

use davlink_lib::editor::TextBuffer;
use davlink_lib::sync::actions::{run_link_action, LinkAction};
use davlink_lib::vault::Vault;
use davlink_lib::SyncContext;

use crate::app::App;
use crate::OutputFormat;

/// Run `action` on the link at 1-based `line`/`column` of a note and save it
pub async fn run(
    app: &App,
    note_path: &str,
    line: usize,
    column: usize,
    action: &LinkAction,
    format: &OutputFormat,
) -> Result<()> {
    if line == 0 || column == 0 {
        bail!("Line and column start at 1");
    }

    let note = app.find_note(note_path)?;
    let content = app.vault.read(&note).await.context("Failed to read note")?;
    let mut buffer = TextBuffer::new(&content).with_cursor(line - 1, column - 1);

    let store = app.store()?;
    let ctx = SyncContext::new(&app.settings, &app.vault, &store);
    let result = run_link_action(&ctx, &mut buffer, &note, action).await?;

    if result.success {
        let updated = buffer.text();
        if updated != content {
            app.vault
                .modify(&note, &updated, None)
                .await
                .context("Failed to save note")?;
        }
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Plain => {
            if !result.success {
                bail!("{}", result.message.unwrap_or_default());
            }
            match result.new_link {
                Some(new_link) => println!("{} -> {}", result.link.path, new_link),
                None => println!("Removed {}", result.link.path),
            }
            if let Some(message) = result.message {
                eprintln!("Warning: {}", message);
            }
        }
    }
    Ok(())
}
