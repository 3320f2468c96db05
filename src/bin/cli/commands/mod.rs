pub mod config;
pub mod download;
pub mod link;
pub mod paste;
pub mod test;
pub mod upload;

use anyhow::Result;

use davlink_lib::sync::BatchSummary;
use davlink_lib::vault::VaultFile;
use davlink_lib::BatchProcessFileResult;

use crate::OutputFormat;

/// Print the outcome of a batch run, failures listed individually
pub fn print_batch(
    verb: &str,
    summary: &BatchSummary,
    results: &[BatchProcessFileResult],
    log_file: Option<&VaultFile>,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "summary": summary,
                "results": results,
                "logFile": log_file.map(|f| f.path.as_str()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{} {} file(s), {} failed", verb, summary.succeeded, summary.failed);
            for result in results.iter().filter(|r| !r.success) {
                println!("  ✗ {}: {}", result.note.path, result.message.as_deref().unwrap_or(""));
            }
            if summary.delete_failures > 0 {
                println!("{} local file(s) could not be deleted", summary.delete_failures);
            }
            if let Some(file) = log_file {
                println!("Log written to {}", file.path);
            }
        }
    }
    Ok(())
}
