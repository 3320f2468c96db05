use anyhow::Result;

use davlink_lib::Settings;

use crate::app::App;
use crate::OutputFormat;

const PASSWORD_MASK: &str = "********";

fn masked(settings: &Settings) -> Settings {
    let mut settings = settings.clone();
    if !settings.password.is_empty() {
        settings.password = PASSWORD_MASK.to_string();
    }
    settings
}

pub fn run_show(app: &App, format: &OutputFormat) -> Result<()> {
    let settings = masked(&app.settings);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        OutputFormat::Plain => {
            println!("Settings file: {}", app.settings_path.display());
            let value = serde_json::to_value(&settings)?;
            if let Some(fields) = value.as_object() {
                for (key, value) in fields {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    println!("  {} = {}", key, value);
                }
            }
        }
    }
    Ok(())
}

pub fn run_set(app: &mut App, key: &str, value: &str, format: &OutputFormat) -> Result<()> {
    app.settings.set_option(key, value)?;
    app.save_settings()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&masked(&app.settings))?);
        }
        OutputFormat::Plain => {
            println!("Saved {} to {}", key, app.settings_path.display());
        }
    }
    Ok(())
}
