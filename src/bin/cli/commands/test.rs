use anyhow::{bail, Result};

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let store = app.store()?;
    let error = store.test_connection().await;

    if let OutputFormat::Json = format {
        let output = serde_json::json!({
            "url": app.settings.url,
            "ok": error.is_none(),
            "error": error,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match error {
        None => {
            println!("Connected to {}", app.settings.url);
            Ok(())
        }
        Some(message) => bail!("{}", message),
    }
}
