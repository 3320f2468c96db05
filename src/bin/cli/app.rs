use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use davlink_lib::vault::{FsVault, Vault, VaultFile};
use davlink_lib::webdav::{RemoteStore, ReqwestTransport};
use davlink_lib::Settings;

/// Command line overrides for building the [`App`]
pub struct Options {
    pub vault: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub attachment_folder: Option<String>,
    pub markdown_links: bool,
}

/// Shared application state for CLI commands
pub struct App {
    pub settings_path: PathBuf,
    pub settings: Settings,
    pub vault: FsVault,
}

impl App {
    pub fn new(options: Options) -> Result<Self> {
        let settings_path = match options.settings {
            Some(path) => path,
            None => Settings::default_path().context("Failed to locate settings file")?,
        };
        let settings = Settings::load(&settings_path)
            .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

        let root = match options.vault {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        if !root.is_dir() {
            bail!("Vault directory {} does not exist", root.display());
        }

        let mut vault = FsVault::new(root).with_markdown_links(options.markdown_links);
        if let Some(folder) = options.attachment_folder.as_deref() {
            vault = vault.with_attachment_folder(folder);
        }

        Ok(Self {
            settings_path,
            settings,
            vault,
        })
    }

    /// Remote store for the configured server
    pub fn store(&self) -> Result<RemoteStore> {
        if self.settings.url.is_empty() {
            bail!("No server configured. Run `davlink config set url <URL>` first");
        }
        let transport = ReqwestTransport::new().context("Failed to create HTTP client")?;
        RemoteStore::from_settings(&self.settings, Arc::new(transport)).context("Invalid server URL")
    }

    /// Find a note by vault path, with or without the `.md` extension
    pub fn find_note(&self, path: &str) -> Result<VaultFile> {
        let path = path.trim_start_matches("./");
        let candidates = [path.to_string(), format!("{}.md", path)];

        for candidate in &candidates {
            if let Some(file) = self.vault.file(candidate).context("Failed to read vault")? {
                return Ok(file);
            }
        }
        bail!("No note at '{}'", path)
    }

    pub fn save_settings(&self) -> Result<()> {
        self.settings
            .save(&self.settings_path)
            .with_context(|| format!("Failed to save settings to {}", self.settings_path.display()))
    }
}

/// Flag set by Ctrl-C so batches stop between links
pub fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the current link");
            handle.store(true, Ordering::Relaxed);
        }
    });
    flag
}
