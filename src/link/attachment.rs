//! Behavior shared by every link variant.

use super::{FilePayload, Link, LinkData, LinkError, LinkType};
use crate::format::{FormatVariables, PathFormatter};
use crate::link::DownloadFileInfo;
use crate::sync::SyncContext;
use crate::vault::VaultFile;
use crate::webdav::FileInfo;

impl Link {
    pub(super) fn base_uploadable(&self) -> bool {
        if self.link_type == LinkType::External {
            return false;
        }
        match self.data {
            LinkData::Payload(_) => true,
            LinkData::Info(_) => !self.excluded,
        }
    }

    pub(super) fn base_downloadable(&self) -> bool {
        if self.link_type == LinkType::Local {
            return false;
        }
        match self.data {
            LinkData::Payload(_) => false,
            LinkData::Info(_) => self.remote,
        }
    }

    pub(super) fn base_markdown(file_info: &FileInfo) -> String {
        format!("[{}]({})", file_info.file_name, file_info.url)
    }

    /// Read the payload, expand the path template and PUT it
    pub(super) async fn base_transfer(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
    ) -> Result<FileInfo, LinkError> {
        let payload = match self.data {
            LinkData::Payload(ref payload) => payload.clone(),
            LinkData::Info(_) => {
                let file = self.local_file(ctx.vault, &note.path)?.clone();
                let bytes = ctx.vault.read_binary(&file).await?;
                FilePayload::new(file.name(), bytes, file.stat.mtime)
            }
        };

        let variables = FormatVariables::new(&payload.name, payload.mtime, note);
        let path = PathFormatter::new().format(&ctx.settings.format, &variables);
        log::info!("Uploading '{}' to '{}'", payload.name, path);

        Ok(ctx.store.upload(&payload, &path).await?)
    }

    /// GET the remote bytes, returning the remote file name with them
    pub(super) async fn fetch_remote(&self, ctx: &SyncContext<'_>) -> Result<(String, Vec<u8>), LinkError> {
        if !self.downloadable() {
            return Err(LinkError::NotDownloadable(self.describe().to_string()));
        }
        log::info!("Downloading '{}'", self.describe());
        Ok(ctx.store.download(self.data.target()).await?)
    }

    /// Write downloaded bytes as a new attachment of `note`
    pub(super) async fn materialize(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DownloadFileInfo, LinkError> {
        let path = ctx.vault.available_attachment_path(file_name, &note.path).await?;
        let file = ctx.vault.create_binary(&path, bytes).await?;
        let markdown_link = ctx.vault.generate_link(&file);
        self.local_file = Some(file.clone());

        Ok(DownloadFileInfo { file, markdown_link })
    }

    pub(super) async fn base_download(
        &mut self,
        ctx: &SyncContext<'_>,
        note: &VaultFile,
    ) -> Result<DownloadFileInfo, LinkError> {
        let (file_name, bytes) = self.fetch_remote(ctx).await?;
        self.materialize(ctx, note, &file_name, &bytes).await
    }

    pub(super) async fn base_rename(&mut self, ctx: &SyncContext<'_>, new_path: &str) -> Result<String, LinkError> {
        if !self.downloadable() {
            return Err(LinkError::NotDownloadable(self.describe().to_string()));
        }
        let old_path = ctx.store.path_for(self.data.target());
        Ok(ctx.store.rename(&old_path, new_path).await?)
    }

    pub(super) async fn base_delete(&mut self, ctx: &SyncContext<'_>) -> Result<(), LinkError> {
        if !self.downloadable() {
            return Err(LinkError::NotDownloadable(self.describe().to_string()));
        }
        log::info!("Deleting remote file '{}'", self.describe());
        Ok(ctx.store.delete(self.data.target()).await?)
    }
}
