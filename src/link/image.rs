use super::{FileType, Link, Variant};
use crate::settings::Settings;
use crate::webdav::FileInfo;

pub(super) fn factory(_settings: &Settings, file_type: FileType) -> Option<Variant> {
    (file_type == FileType::Image).then_some(Variant::Image)
}

/// Make sure link text renders as an embed
pub(super) fn embed(link: String) -> String {
    if link.starts_with('!') {
        link
    } else {
        format!("!{}", link)
    }
}

impl Link {
    pub(super) fn image_markdown(file_info: &FileInfo) -> String {
        format!("![{}]({})", file_info.file_name, file_info.url)
    }
}
