//! PDF links with optional placeholder indirection.
//!
//! With `enableDummyPdf` on, an uploaded PDF is replaced by a small local note
//! whose whole content is the remote URL. Any local `.pdf` link can therefore
//! be either real PDF bytes or such a placeholder, which is only known after
//! reading the file in [`Link::init`].

use super::{image, FileType, Link, LinkData, LinkError, LinkType, Variant};
use crate::link::DownloadFileInfo;
use crate::settings::Settings;
use crate::sync::SyncContext;
use crate::vault::VaultFile;
use crate::webdav::FileInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PdfState {
    enabled: bool,
    /// `None` until init has read the file
    pub(super) is_dummy: Option<bool>,
    dummy_file: Option<VaultFile>,
}

impl PdfState {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            is_dummy: if enabled { None } else { Some(false) },
            dummy_file: None,
        }
    }
}

pub(super) fn factory(settings: &Settings, file_type: FileType) -> Option<Variant> {
    (file_type == FileType::Pdf).then(|| Variant::Pdf(PdfState::new(settings.enable_dummy_pdf)))
}

fn is_url(content: &[u8]) -> bool {
    content.starts_with(b"http://") || content.starts_with(b"https://")
}

impl Link {
    pub(super) fn pdf_uploadable(&self, state: &PdfState) -> bool {
        if !state.enabled {
            return self.base_uploadable();
        }
        if self.link_type == LinkType::External {
            return false;
        }
        match self.data {
            LinkData::Payload(_) => true,
            LinkData::Info(_) => !self.excluded && state.is_dummy != Some(true),
        }
    }

    pub(super) fn pdf_downloadable(&self, state: &PdfState) -> bool {
        if !state.enabled || self.link_type == LinkType::External {
            return self.base_downloadable();
        }
        match self.data {
            LinkData::Payload(_) => false,
            LinkData::Info(_) => state.is_dummy != Some(false),
        }
    }

    pub(super) async fn pdf_init(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<(), LinkError> {
        let Some(state) = self.pdf_state() else {
            return Ok(());
        };
        if state.is_dummy.is_some() {
            return Ok(());
        }

        let is_payload = matches!(self.data, LinkData::Payload(_));
        if self.link_type == LinkType::External || is_payload {
            if let Some(state) = self.pdf_state_mut() {
                state.is_dummy = Some(is_payload);
            }
            return Ok(());
        }

        let file = self.local_file(ctx.vault, &note.path)?.clone();
        let content = ctx.vault.read_binary(&file).await?;
        if !is_url(&content) {
            if let Some(state) = self.pdf_state_mut() {
                state.is_dummy = Some(false);
            }
            return Ok(());
        }

        let url = String::from_utf8_lossy(&content).trim().to_string();
        log::debug!("'{}' is a placeholder for '{}'", file.path, url);
        self.remote = ctx.settings.is_webdav_url(&url);
        self.link_type = LinkType::External;
        if let LinkData::Info(info) = &mut self.data {
            info.path = url;
        }
        if let Some(state) = self.pdf_state_mut() {
            state.is_dummy = Some(true);
            state.dummy_file = Some(file);
        }
        Ok(())
    }

    pub(super) async fn pdf_render_upload(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
        file_info: &FileInfo,
    ) -> Result<String, LinkError> {
        if !ctx.settings.enable_dummy_pdf {
            return Ok(Self::base_markdown(file_info));
        }

        let path = ctx
            .vault
            .available_attachment_path(&file_info.file_name, &note.path)
            .await?;
        let placeholder = ctx.vault.create(&path, &file_info.url).await?;
        log::info!("Created placeholder '{}' for '{}'", placeholder.path, file_info.url);

        Ok(image::embed(ctx.vault.generate_link(&placeholder)))
    }

    pub(super) async fn pdf_download(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
    ) -> Result<DownloadFileInfo, LinkError> {
        self.pdf_init(ctx, note).await?;
        let (file_name, bytes) = self.fetch_remote(ctx).await?;

        // The placeholder usually holds the name the real PDF should take
        if let Some(dummy) = self.pdf_state_mut().and_then(|state| state.dummy_file.take()) {
            ctx.vault.delete(&dummy).await?;
        }

        let mut info = self.materialize(ctx, note, &file_name, &bytes).await?;
        info.markdown_link = image::embed(info.markdown_link);
        Ok(info)
    }

    pub(super) async fn pdf_rename(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
        new_path: &str,
    ) -> Result<String, LinkError> {
        self.pdf_init(ctx, note).await?;
        let new_url = self.base_rename(ctx, new_path).await?;

        if let Some(dummy) = self.pdf_state().and_then(|state| state.dummy_file.as_ref()) {
            ctx.vault.modify(dummy, &new_url, None).await?;
        }
        if let LinkData::Info(info) = &mut self.data {
            info.path = new_url.clone();
        }

        Ok(new_url)
    }

    pub(super) async fn pdf_delete(&mut self, ctx: &SyncContext<'_>, note: &VaultFile) -> Result<(), LinkError> {
        self.pdf_init(ctx, note).await?;
        self.base_delete(ctx).await?;

        if let Some(dummy) = self.pdf_state_mut().and_then(|state| state.dummy_file.take()) {
            ctx.vault.delete(&dummy).await?;
        }
        Ok(())
    }
}
