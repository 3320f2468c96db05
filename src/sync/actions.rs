//! Edits driven by the cursor position or a pasted file.

use crate::editor::{replace_link, selected_link, Editor};
use crate::link::{create_link, FilePayload, LinkError};
use crate::vault::VaultFile;

use super::operation;
use super::{BatchProcessFileResult, SyncContext, SyncError};

/// What to do with the link under the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Upload,
    Download,
    Delete,
    /// Move the remote file to this path
    Rename(String),
}

impl LinkAction {
    fn verb(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Rename(_) => "rename",
        }
    }
}

/// Run `action` on the link under the editor cursor and splice the outcome
/// into the line.
///
/// Failures of the action itself come back as a failed result; only a cursor
/// that is not on a link is an error.
pub async fn run_link_action(
    ctx: &SyncContext<'_>,
    editor: &mut dyn Editor,
    note: &VaultFile,
    action: &LinkAction,
) -> Result<BatchProcessFileResult, SyncError> {
    let cursor = editor.cursor();
    let line = editor
        .line(cursor.line)
        .ok_or(SyncError::LineOutOfRange(cursor.line))?;
    let info = selected_link(&line, cursor.ch).ok_or(SyncError::NoLinkAtCursor {
        line: cursor.line,
        column: cursor.ch,
    })?;
    log::info!("Running {} on '{}'", action.verb(), info.path);

    let mut link = create_link(ctx.settings, info.clone());
    // (replacement text, new link, note about a side effect that failed)
    let outcome: Result<(String, Option<String>, Option<String>), LinkError> = match action {
        LinkAction::Upload => operation::upload(ctx, &mut link, note)
            .await
            .map(|uploaded| (uploaded.info.markdown_link, Some(uploaded.info.url), uploaded.delete_error)),
        LinkAction::Download => operation::download(ctx, &mut link, note)
            .await
            .map(|downloaded| (downloaded.markdown_link, Some(downloaded.file.path), None)),
        LinkAction::Delete => operation::delete(ctx, &mut link, note)
            .await
            .map(|()| (String::new(), None, None)),
        LinkAction::Rename(new_path) => operation::rename(ctx, &mut link, note, &info.raw, new_path)
            .await
            .map(|text| (text.clone(), Some(text), None)),
    };

    match outcome {
        Ok((text, new_link, message)) => {
            replace_link(editor, cursor.line, &info, &text);
            Ok(BatchProcessFileResult {
                success: true,
                note: note.clone(),
                link: info,
                new_link,
                message,
            })
        }
        Err(e) => {
            let message = format!("Failed to {} '{}', {}", action.verb(), info.path, e);
            log::error!("{}", message);
            Ok(BatchProcessFileResult::failed(note, info, message))
        }
    }
}

/// Upload a pasted or dropped file and return the link text to insert.
///
/// `None` means the file is left to the host: uploads on paste are switched
/// off or the extension is not included.
pub async fn upload_payload(
    ctx: &SyncContext<'_>,
    note: &VaultFile,
    payload: FilePayload,
) -> Result<Option<String>, LinkError> {
    if !ctx.settings.enable_upload || ctx.settings.is_excluded(&payload.name) {
        return Ok(None);
    }

    log::info!("Uploading file: '{}'", payload.name);
    let mut link = create_link(ctx.settings, payload);
    let uploaded = link.upload(ctx, note).await?;
    Ok(Some(uploaded.markdown_link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use crate::settings::UploadedFileOperation;
    use crate::test_support::{Fixture, BASE_URL};
    use chrono::Utc;

    #[tokio::test]
    async fn test_upload_link_under_cursor() {
        let fixture = Fixture::new();
        fixture.write("a.png", b"png");
        let note = fixture.note("note.md", "");
        let mut buffer = TextBuffer::new("title\nsee [[a.png]] here").with_cursor(1, 7);

        let result = run_link_action(&fixture.ctx(), &mut buffer, &note, &LinkAction::Upload)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(buffer.text(), format!("title\nsee ![a.png]({}/a.png) here", BASE_URL));
        assert!(!fixture.exists("a.png"));
    }

    #[tokio::test]
    async fn test_upload_keeps_success_when_local_file_cannot_be_disposed() {
        let mut settings = Fixture::settings();
        settings.uploaded_file_operation = UploadedFileOperation::Trash;
        let fixture = Fixture::with_settings(settings);
        fixture.write(".trash", b"");
        fixture.write("a.png", b"png");
        let note = fixture.note("note.md", "");
        let mut buffer = TextBuffer::new("[[a.png]]");

        let result = run_link_action(&fixture.ctx(), &mut buffer, &note, &LinkAction::Upload)
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.message.unwrap().starts_with("Failed to delete local file 'a.png'"));
        assert_eq!(buffer.text(), format!("![a.png]({}/a.png)", BASE_URL));
        assert!(fixture.exists("a.png"));
    }

    #[tokio::test]
    async fn test_delete_removes_link_text() {
        let fixture = Fixture::new();
        fixture.server.insert("/a.png", b"png");
        let note = fixture.note("note.md", "");
        let mut buffer = TextBuffer::new(&format!("x ![a]({}/a.png) y", BASE_URL)).with_cursor(0, 4);

        let result = run_link_action(&fixture.ctx(), &mut buffer, &note, &LinkAction::Delete)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(buffer.text(), "x  y");
        assert!(!fixture.server.contains("/a.png"));
    }

    #[tokio::test]
    async fn test_failed_action_leaves_line_untouched() {
        let fixture = Fixture::new();
        let note = fixture.note("note.md", "");
        let line = format!("![a]({}/missing.png)", BASE_URL);
        let mut buffer = TextBuffer::new(&line).with_cursor(0, 2);

        let result = run_link_action(&fixture.ctx(), &mut buffer, &note, &LinkAction::Download)
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.message.unwrap().starts_with("Failed to download"));
        assert_eq!(buffer.text(), line);
    }

    #[tokio::test]
    async fn test_rename_under_cursor() {
        let fixture = Fixture::new();
        fixture.server.insert("/a.png", b"png");
        let note = fixture.note("note.md", "");
        let mut buffer = TextBuffer::new(&format!("![a]({}/a.png)", BASE_URL));

        let action = LinkAction::Rename("/2024/a.png".to_string());
        let result = run_link_action(&fixture.ctx(), &mut buffer, &note, &action).await.unwrap();

        assert!(result.success);
        assert_eq!(buffer.text(), format!("![a]({}/2024/a.png)", BASE_URL));
    }

    #[tokio::test]
    async fn test_cursor_off_link_is_an_error() {
        let fixture = Fixture::new();
        let note = fixture.note("note.md", "");
        let mut buffer = TextBuffer::new("plain text [[a.png]]").with_cursor(0, 1);

        let err = run_link_action(&fixture.ctx(), &mut buffer, &note, &LinkAction::Upload)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NoLinkAtCursor { line: 0, column: 1 }));
    }

    #[tokio::test]
    async fn test_upload_payload() {
        let fixture = Fixture::new();
        let note = fixture.note("note.md", "");
        let payload = FilePayload::new("shot.png", b"png".to_vec(), Utc::now());

        let link = upload_payload(&fixture.ctx(), &note, payload).await.unwrap();
        assert_eq!(link, Some(format!("![shot.png]({}/shot.png)", BASE_URL)));
        assert!(fixture.server.contains("/shot.png"));
    }

    #[tokio::test]
    async fn test_upload_payload_declines_excluded_or_disabled() {
        let mut settings = Fixture::settings();
        settings.enable_upload = false;
        let disabled = Fixture::with_settings(settings);
        let note = disabled.note("note.md", "");
        let payload = FilePayload::new("shot.png", b"png".to_vec(), Utc::now());
        assert_eq!(upload_payload(&disabled.ctx(), &note, payload).await.unwrap(), None);

        let fixture = Fixture::new();
        let note = fixture.note("note.md", "");
        let payload = FilePayload::new("notes.txt", b"txt".to_vec(), Utc::now());
        assert_eq!(upload_payload(&fixture.ctx(), &note, payload).await.unwrap(), None);
        assert!(fixture.server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_pasted_pdf_becomes_placeholder() {
        let mut settings = Fixture::settings();
        settings.enable_dummy_pdf = true;
        settings.include_extensions.push("pdf".to_string());
        let fixture = Fixture::with_settings(settings);
        let note = fixture.note("note.md", "");
        let payload = FilePayload::new("paper.pdf", b"%PDF".to_vec(), Utc::now());

        let link = upload_payload(&fixture.ctx(), &note, payload).await.unwrap().unwrap();
        assert_eq!(link, "![[paper.pdf]]");
        assert_eq!(fixture.read("paper.pdf"), format!("{}/paper.pdf", BASE_URL));
    }
}
