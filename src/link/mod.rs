//! Typed links.
//!
//! [`create_link`] classifies a parsed [`LinkInfo`] or a pasted [`FilePayload`]
//! into a [`Link`] whose variant decides how it uploads, downloads, renames and
//! deletes. Images always render as embeds; PDFs may be swapped for a local
//! placeholder note that only holds the remote URL.

mod attachment;
mod image;
pub mod parser;
mod pdf;
mod types;

pub use parser::{link_at, match_links, splice, LinkInfo};
pub use types::{
    DownloadFileInfo, FilePayload, FileType, LinkData, LinkError, LinkType, UploadFileInfo,
};

use crate::settings::Settings;
use crate::sync::SyncContext;
use crate::vault::{Vault, VaultFile};
use crate::webdav::FileInfo;

use pdf::PdfState;

/// Variant-specific behavior of a link
#[derive(Debug, Clone, PartialEq, Eq)]
enum Variant {
    Attachment,
    Image,
    Pdf(PdfState),
}

/// Picks a specialized variant for a file type, if it handles it
type LinkFactory = fn(&Settings, FileType) -> Option<Variant>;

/// Specialized variants, tried in order before falling back to a plain attachment
const FACTORIES: &[LinkFactory] = &[image::factory, pdf::factory];

/// Classify `data` into a typed link
pub fn create_link(settings: &Settings, data: impl Into<LinkData>) -> Link {
    let data = data.into();
    let file_type = FileType::from_name(data.target());
    let variant = FACTORIES
        .iter()
        .find_map(|factory| factory(settings, file_type))
        .unwrap_or(Variant::Attachment);

    Link::new(settings, data, file_type, variant)
}

/// A link together with what it is allowed to do
#[derive(Debug, Clone)]
pub struct Link {
    data: LinkData,
    link_type: LinkType,
    file_type: FileType,
    /// Target excluded from uploads by the extension allowlist
    excluded: bool,
    /// Target is a URL on the configured server
    remote: bool,
    /// Vault file behind a local link, resolved on first use
    local_file: Option<VaultFile>,
    variant: Variant,
}

impl Link {
    fn new(settings: &Settings, data: LinkData, file_type: FileType, variant: Variant) -> Self {
        let (link_type, excluded, remote) = match &data {
            LinkData::Payload(_) => (LinkType::Local, false, false),
            LinkData::Info(info) => (
                LinkType::of_path(&info.path),
                settings.is_excluded(&info.path),
                settings.is_webdav_url(&info.path),
            ),
        };

        Self {
            data,
            link_type,
            file_type,
            excluded,
            remote,
            local_file: None,
            variant,
        }
    }

    pub fn data(&self) -> &LinkData {
        &self.data
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Human-readable target used in error messages
    pub fn describe(&self) -> &str {
        self.data.target()
    }

    /// Whether this link points at a PDF placeholder note. `None` until
    /// [`Link::init`] has run for PDF links, always `Some(false)` otherwise.
    pub fn is_dummy_pdf(&self) -> Option<bool> {
        match &self.variant {
            Variant::Pdf(state) => state.is_dummy,
            _ => Some(false),
        }
    }

    /// Whether [`Link::upload`] may be called. Before `init` a PDF answers
    /// optimistically.
    pub fn uploadable(&self) -> bool {
        match &self.variant {
            Variant::Pdf(state) => self.pdf_uploadable(state),
            _ => self.base_uploadable(),
        }
    }

    /// Whether [`Link::download`], [`Link::rename`] and [`Link::delete`] may be
    /// called. Before `init` a PDF answers optimistically.
    pub fn downloadable(&self) -> bool {
        match &self.variant {
            Variant::Pdf(state) => self.pdf_downloadable(state),
            _ => self.base_downloadable(),
        }
    }

    /// Finish classification that needs to read file content. Only the first
    /// call does any work.
    pub async fn init(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<(), LinkError> {
        if matches!(self.variant, Variant::Pdf(_)) {
            self.pdf_init(ctx, note).await?;
        }
        Ok(())
    }

    /// Vault file behind this link, resolved once and cached
    pub fn local_file(&mut self, vault: &dyn Vault, source_path: &str) -> Result<&VaultFile, LinkError> {
        if self.local_file.is_none() {
            let info = match &self.data {
                LinkData::Payload(payload) => return Err(LinkError::NoVaultFile(payload.name.clone())),
                LinkData::Info(info) => info,
            };
            let file = vault
                .resolve_link(&info.path, source_path)
                .ok_or_else(|| LinkError::NotFound(info.path.clone()))?;
            self.local_file = Some(file);
        }

        self.local_file
            .as_ref()
            .ok_or_else(|| LinkError::NotFound(self.data.target().to_string()))
    }

    /// Push the file to the server without rendering any link text
    pub async fn transfer(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<FileInfo, LinkError> {
        self.init(ctx, note).await?;
        if !self.uploadable() {
            return Err(LinkError::NotUploadable(self.describe().to_string()));
        }
        self.base_transfer(ctx, note).await
    }

    /// Link text for an already uploaded file as it should appear in `note`
    pub async fn render_upload(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
        file_info: &FileInfo,
    ) -> Result<String, LinkError> {
        match self.variant {
            Variant::Image => Ok(Self::image_markdown(file_info)),
            Variant::Pdf(_) => self.pdf_render_upload(ctx, note, file_info).await,
            Variant::Attachment => Ok(Self::base_markdown(file_info)),
        }
    }

    /// Upload the file and produce the replacement link text
    pub async fn upload(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<UploadFileInfo, LinkError> {
        let file_info = self.transfer(ctx, note).await?;
        let markdown_link = self.render_upload(ctx, note, &file_info).await?;

        Ok(UploadFileInfo {
            file_name: file_info.file_name,
            url: file_info.url,
            markdown_link,
        })
    }

    /// Fetch the remote file into the vault next to `note`
    pub async fn download(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<DownloadFileInfo, LinkError> {
        match self.variant {
            Variant::Image => {
                let mut info = self.base_download(ctx, note).await?;
                info.markdown_link = image::embed(info.markdown_link);
                Ok(info)
            }
            Variant::Pdf(_) => self.pdf_download(ctx, note).await,
            Variant::Attachment => self.base_download(ctx, note).await,
        }
    }

    /// Move the remote file to `new_path` and return its new URL
    pub async fn rename(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
        new_path: &str,
    ) -> Result<String, LinkError> {
        match self.variant {
            Variant::Pdf(_) => self.pdf_rename(ctx, note, new_path).await,
            _ => self.base_rename(ctx, new_path).await,
        }
    }

    /// Remove the remote file
    pub async fn delete(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<(), LinkError> {
        match self.variant {
            Variant::Pdf(_) => self.pdf_delete(ctx, note).await,
            _ => self.base_delete(ctx).await,
        }
    }

    fn pdf_state(&self) -> Option<&PdfState> {
        match &self.variant {
            Variant::Pdf(state) => Some(state),
            _ => None,
        }
    }

    fn pdf_state_mut(&mut self) -> Option<&mut PdfState> {
        match &mut self.variant {
            Variant::Pdf(state) => Some(state),
            _ => None,
        }
    }
}
