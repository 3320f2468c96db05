use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// What happens to a local attachment once it has been uploaded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadedFileOperation {
    /// Move the file into the vault trash
    #[serde(rename = "default", alias = "trash")]
    Trash,
    /// Delete the file permanently
    #[default]
    Delete,
    /// Keep the file
    None,
}

impl std::str::FromStr for UploadedFileOperation {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "trash" => Ok(Self::Trash),
            "delete" => Ok(Self::Delete),
            "none" => Ok(Self::None),
            other => Err(SettingsError::InvalidValue {
                key: "uploadedFileOperation".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Uploader settings, persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// WebDAV server URL, stored without a trailing slash
    pub url: String,
    pub username: String,
    pub password: String,
    /// Skip injecting credentials into rendered image requests
    pub disable_basic_auth: bool,

    /// Upload files as soon as they are pasted or dropped into a note
    pub enable_upload: bool,
    /// Remote path template, always starting with `/`
    pub format: String,
    /// Lowercase extensions (without `.`) eligible for upload
    pub include_extensions: Vec<String>,
    pub uploaded_file_operation: UploadedFileOperation,
    /// Replace uploaded PDFs with a local placeholder holding the remote URL
    pub enable_dummy_pdf: bool,
    /// Write a log note after each batch run
    pub create_batch_log: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            disable_basic_auth: false,
            enable_upload: true,
            format: "/{{nameext}}".to_string(),
            include_extensions: ["jpg", "jpeg", "png", "gif", "svg", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            uploaded_file_operation: UploadedFileOperation::Delete,
            enable_dummy_pdf: false,
            create_batch_log: true,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|p| p.join("davlink").join("settings.json"))
            .ok_or(SettingsError::ConfigDirNotFound)
    }

    /// Load settings from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&data)?;
        settings.normalize();
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn normalize(&mut self) {
        let url = std::mem::take(&mut self.url);
        self.set_url(&url);
        let format = std::mem::take(&mut self.format);
        self.set_format(&format);
        self.include_extensions = self
            .include_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn set_format(&mut self, format: &str) {
        let format = format.trim();
        self.format = format!("/{}", format.trim_start_matches('/'));
    }

    /// Parse a comma-separated extension list
    pub fn set_include_extensions(&mut self, value: &str) {
        self.include_extensions = value
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
    }

    /// Set an option by its camelCase or kebab-case name
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let parse_bool = |value: &str| -> Result<bool, SettingsError> {
            match value.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(SettingsError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            }
        };

        match key.replace('-', "").to_lowercase().as_str() {
            "url" => {
                let url = value.trim();
                if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(SettingsError::InvalidUrl(
                        "URL must start with http:// or https://".to_string(),
                    ));
                }
                self.set_url(url);
            }
            "username" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            "disablebasicauth" => self.disable_basic_auth = parse_bool(value)?,
            "enableupload" => self.enable_upload = parse_bool(value)?,
            "format" => self.set_format(value),
            "includeextensions" => self.set_include_extensions(value),
            "uploadedfileoperation" => self.uploaded_file_operation = value.parse()?,
            "enabledummypdf" => self.enable_dummy_pdf = parse_bool(value)?,
            "createbatchlog" => self.create_batch_log = parse_bool(value)?,
            _ => return Err(SettingsError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Whether a path is kept out of uploads by the extension allowlist.
    /// Paths without an extension, such as links to other notes, are always
    /// excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rfind('.') {
            Some(idx) => {
                let extension = name[idx + 1..].to_lowercase();
                !self.include_extensions.iter().any(|ext| *ext == extension)
            }
            None => true,
        }
    }

    /// Whether a link target points into the configured server. The URL must
    /// match whole path segments.
    pub fn is_webdav_url(&self, path: &str) -> bool {
        if self.url.is_empty() {
            return false;
        }
        path.strip_prefix(self.url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Credentials for the Authorization header, if both parts are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}
