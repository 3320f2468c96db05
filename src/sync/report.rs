//! Batch result log rendered as a markdown note.

use chrono::Local;

use super::{BatchProcessFileResult, DeleteError};
use crate::vault::{self, Vault, VaultError, VaultFile};

pub const LOG_FILE_PREFIX: &str = "webdav-batch-log-";

const RESULT_HEADERS: &[&str] = &["Status", "Original Link", "New Link", "Error Message"];
const DELETE_HEADERS: &[&str] = &["File", "Error Message"];

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn table_header(headers: &[&str]) -> String {
    let separator: Vec<&str> = headers.iter().map(|_| "---").collect();
    format!("| {} |\n| {} |\n", headers.join(" | "), separator.join(" | "))
}

/// Render results grouped by note, successes first within each note.
///
/// `delete_errors` adds the section for files that could not be disposed of
/// after an upload.
pub fn render_log(
    vault: &dyn Vault,
    results: &[BatchProcessFileResult],
    delete_errors: Option<&[DeleteError]>,
) -> String {
    let mut notes: Vec<(&VaultFile, Vec<&BatchProcessFileResult>)> = Vec::new();
    for result in results {
        match notes.iter_mut().find(|(note, _)| note.path == result.note.path) {
            Some((_, group)) => group.push(result),
            None => notes.push((&result.note, vec![result])),
        }
    }

    let mut content = String::from("## Processed Notes\n\n");
    for (note, mut group) in notes {
        group.sort_by_key(|result| !result.success);

        content.push_str(&format!("### {}\n\n", vault.generate_link(note)));
        content.push_str(&table_header(RESULT_HEADERS));
        for result in group {
            content.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                if result.success { "✓" } else { "✗" },
                cell(&result.link.path),
                cell(result.new_link.as_deref().unwrap_or("")),
                cell(result.message.as_deref().unwrap_or("")),
            ));
        }
        content.push('\n');
    }

    if let Some(delete_errors) = delete_errors {
        content.push_str("\n## Failed to Delete Local Files\n\n");
        content.push_str(&table_header(DELETE_HEADERS));
        for error in delete_errors {
            content.push_str(&format!("| {} | {} |\n", cell(&error.file), cell(&error.error)));
        }
    }

    content
}

/// Write the log to a timestamped note at the vault root
pub async fn write_log(
    vault: &dyn Vault,
    results: &[BatchProcessFileResult],
    delete_errors: Option<&[DeleteError]>,
) -> vault::Result<VaultFile> {
    let path = format!("{}{}.md", LOG_FILE_PREFIX, Local::now().format("%Y%m%d-%H%M%S"));
    let content = render_log(vault, results, delete_errors);

    let file = match vault.file(&path)? {
        Some(existing) => {
            vault.modify(&existing, &content, None).await?;
            vault.file(&path)?.ok_or_else(|| VaultError::NotFound(path.clone()))?
        }
        None => vault.create(&path, &content).await?,
    };
    log::info!("Batch log written to '{}'", file.path);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::match_links;
    use crate::test_support::Fixture;

    fn results(fixture: &Fixture) -> Vec<BatchProcessFileResult> {
        let one = fixture.note("notes/one.md", "");
        let two = fixture.note("two.md", "");
        let link = |text: &str| match_links(text).remove(0);

        vec![
            BatchProcessFileResult::failed(&one, link("[[gone.png]]"), "File not found: 'gone.png'"),
            BatchProcessFileResult::succeeded(&one, link("[[a.png]]"), "https://s/a.png"),
            BatchProcessFileResult::succeeded(&two, link("[x](b|c.png)"), "https://s/b.png"),
        ]
    }

    #[test]
    fn test_render_groups_by_note_with_successes_first() {
        let fixture = Fixture::new();
        let log = render_log(&fixture.vault, &results(&fixture), None);

        let expected = "## Processed Notes\n\n\
            ### [[notes/one]]\n\n\
            | Status | Original Link | New Link | Error Message |\n\
            | --- | --- | --- | --- |\n\
            | ✓ | a.png | https://s/a.png |  |\n\
            | ✗ | gone.png |  | File not found: 'gone.png' |\n\n\
            ### [[two]]\n\n\
            | Status | Original Link | New Link | Error Message |\n\
            | --- | --- | --- | --- |\n\
            | ✓ | b\\|c.png | https://s/b.png |  |\n\n";
        assert_eq!(log, expected);
    }

    #[test]
    fn test_render_delete_errors_section() {
        let fixture = Fixture::new();
        let errors = vec![DeleteError {
            file: "a.png".to_string(),
            error: "Failed to delete local file 'a.png', denied".to_string(),
        }];
        let log = render_log(&fixture.vault, &[], Some(errors.as_slice()));

        assert!(log.ends_with(
            "## Failed to Delete Local Files\n\n\
             | File | Error Message |\n\
             | --- | --- |\n\
             | a.png | Failed to delete local file 'a.png', denied |\n"
        ));
    }

    #[tokio::test]
    async fn test_write_log_creates_note_at_root() {
        let fixture = Fixture::new();
        let file = write_log(&fixture.vault, &results(&fixture), Some(&[][..])).await.unwrap();

        assert!(file.path.starts_with(LOG_FILE_PREFIX));
        assert!(file.path.ends_with(".md"));
        assert!(!file.path.contains('/'));
        assert!(fixture.read(&file.path).contains("### [[two]]"));
    }
}
