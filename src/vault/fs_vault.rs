use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{FileStat, Result, Vault, VaultError, VaultFile};
use crate::link::match_links;

const TRASH_FOLDER: &str = ".trash";

/// Vault backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    /// Where new attachments go: `""` is the vault root, `./x` is relative to
    /// the note's folder, anything else is vault-relative
    attachment_folder: String,
    /// Generate `[name](path)` instead of `[[path]]`
    markdown_links: bool,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            attachment_folder: String::new(),
            markdown_links: false,
        }
    }

    pub fn with_attachment_folder(mut self, folder: &str) -> Self {
        self.attachment_folder = folder.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_markdown_links(mut self, enabled: bool) -> Self {
        self.markdown_links = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a vault-relative one, refusing anything that escapes
    fn abs_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(VaultError::OutsideVault(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn rel_path(&self, abs: &Path) -> Option<String> {
        abs.strip_prefix(&self.root)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }

    fn vault_file(&self, abs: &Path) -> Result<VaultFile> {
        let metadata = std::fs::metadata(abs)?;
        let mtime: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let ctime = metadata.created().map(DateTime::<Utc>::from).unwrap_or(mtime);
        let path = self
            .rel_path(abs)
            .ok_or_else(|| VaultError::OutsideVault(abs.display().to_string()))?;

        Ok(VaultFile::new(
            path,
            FileStat {
                ctime,
                mtime,
                size: metadata.len(),
            },
        ))
    }

    /// All files below `dir`, skipping hidden entries such as the trash
    fn walk_files(&self, dir: &Path) -> Vec<VaultFile> {
        let mut files: Vec<VaultFile> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.vault_file(e.path()).ok())
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn exists(&self, path: &str) -> bool {
        self.abs_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// First path of the form `base N.ext` that is not taken
    fn unique_path(&self, folder: &str, file_name: &str) -> String {
        let join = |name: &str| {
            if folder.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", folder, name)
            }
        };

        let candidate = join(file_name);
        if !self.exists(&candidate) {
            return candidate;
        }

        let (base, ext) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
            _ => (file_name, ""),
        };
        let mut n = 1;
        loop {
            let candidate = join(&format!("{} {}{}", base, n, ext));
            if !self.exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn file_if_exists(&self, path: &str) -> Option<VaultFile> {
        let abs = self.abs_path(path).ok()?;
        if abs.is_file() {
            self.vault_file(&abs).ok()
        } else {
            None
        }
    }
}

/// Join `relative` onto `base`, resolving `.` and `..` segments
fn join_normalized(base: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[async_trait]
impl Vault for FsVault {
    fn markdown_files(&self) -> Result<Vec<VaultFile>> {
        self.markdown_files_in("")
    }

    fn markdown_files_in(&self, folder: &str) -> Result<Vec<VaultFile>> {
        let dir = self.abs_path(folder)?;
        if !dir.is_dir() {
            return Err(VaultError::NotFound(folder.to_string()));
        }
        Ok(self
            .walk_files(&dir)
            .into_iter()
            .filter(|f| f.is_markdown())
            .collect())
    }

    fn folder_files(&self, folder: &str) -> Result<Vec<VaultFile>> {
        let dir = self.abs_path(folder)?;
        if !dir.is_dir() {
            return Err(VaultError::NotFound(folder.to_string()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type()?.is_file() {
                files.push(self.vault_file(&entry.path())?);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn file(&self, path: &str) -> Result<Option<VaultFile>> {
        let abs = self.abs_path(path)?;
        if abs.is_file() {
            Ok(Some(self.vault_file(&abs)?))
        } else {
            Ok(None)
        }
    }

    fn resolve_link(&self, link_path: &str, source_path: &str) -> Option<VaultFile> {
        if link_path.contains("://") {
            return None;
        }
        let target = link_path.split('#').next().unwrap_or(link_path).trim();
        if target.is_empty() {
            return None;
        }

        let mut candidates = Vec::new();
        if let Some(absolute) = join_normalized("", target) {
            candidates.push(absolute);
        }
        if let Some(relative) = join_normalized(parent_of(source_path), target) {
            candidates.push(relative);
        }
        if !target.rsplit('/').next().unwrap_or(target).contains('.') {
            let with_md: Vec<String> = candidates.iter().map(|c| format!("{}.md", c)).collect();
            candidates.extend(with_md);
        }

        for candidate in &candidates {
            if let Some(file) = self.file_if_exists(candidate) {
                return Some(file);
            }
        }

        // Fall back to the shortest path with a matching file name
        let name = target.rsplit('/').next().unwrap_or(target);
        let name_md = format!("{}.md", name);
        self.walk_files(&self.root)
            .into_iter()
            .filter(|f| f.name() == name || f.name() == name_md)
            .min_by(|a, b| {
                let depth = |f: &VaultFile| f.path.matches('/').count();
                depth(a).cmp(&depth(b)).then_with(|| a.path.cmp(&b.path))
            })
    }

    fn generate_link(&self, file: &VaultFile) -> String {
        if self.markdown_links {
            let encoded = file
                .path
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/");
            format!("[{}]({})", file.name(), encoded)
        } else if file.is_markdown() {
            format!("[[{}]]", file.path.trim_end_matches(".md"))
        } else {
            format!("[[{}]]", file.path)
        }
    }

    async fn read(&self, file: &VaultFile) -> Result<String> {
        let abs = self.abs_path(&file.path)?;
        match tokio::fs::read_to_string(&abs).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(file.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_binary(&self, file: &VaultFile) -> Result<Vec<u8>> {
        let abs = self.abs_path(&file.path)?;
        match tokio::fs::read(&abs).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(file.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, path: &str, content: &str) -> Result<VaultFile> {
        self.create_binary(path, content.as_bytes()).await
    }

    async fn create_binary(&self, path: &str, data: &[u8]) -> Result<VaultFile> {
        let abs = self.abs_path(path)?;
        if abs.exists() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&abs, data).await?;
        log::debug!("Created vault file '{}' ({} bytes)", path, data.len());
        self.vault_file(&abs)
    }

    async fn modify(&self, file: &VaultFile, content: &str, stat: Option<&FileStat>) -> Result<()> {
        let abs = self.abs_path(&file.path)?;
        if !abs.is_file() {
            return Err(VaultError::NotFound(file.path.clone()));
        }
        tokio::fs::write(&abs, content).await?;

        if let Some(stat) = stat {
            let handle = std::fs::File::options().write(true).open(&abs)?;
            handle.set_modified(SystemTime::from(stat.mtime))?;
        }
        Ok(())
    }

    async fn delete(&self, file: &VaultFile) -> Result<()> {
        let abs = self.abs_path(&file.path)?;
        match tokio::fs::remove_file(&abs).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(file.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn trash(&self, file: &VaultFile) -> Result<()> {
        let abs = self.abs_path(&file.path)?;
        if !abs.is_file() {
            return Err(VaultError::NotFound(file.path.clone()));
        }
        tokio::fs::create_dir_all(self.root.join(TRASH_FOLDER)).await?;
        let destination = self.unique_path(TRASH_FOLDER, file.name());
        tokio::fs::rename(&abs, self.abs_path(&destination)?).await?;
        log::debug!("Moved '{}' to '{}'", file.path, destination);
        Ok(())
    }

    async fn available_attachment_path(&self, file_name: &str, source_path: &str) -> Result<String> {
        let folder = if self.attachment_folder.is_empty() || self.attachment_folder == "/" {
            String::new()
        } else if let Some(relative) = self.attachment_folder.strip_prefix("./") {
            join_normalized(parent_of(source_path), relative)
                .ok_or_else(|| VaultError::OutsideVault(self.attachment_folder.clone()))?
        } else if self.attachment_folder == "." {
            parent_of(source_path).to_string()
        } else {
            join_normalized("", &self.attachment_folder)
                .ok_or_else(|| VaultError::OutsideVault(self.attachment_folder.clone()))?
        };

        // Validate before probing the disk
        self.abs_path(&folder)?;
        Ok(self.unique_path(&folder, file_name))
    }

    async fn referencing_notes(&self, attachment: &VaultFile) -> Result<Vec<VaultFile>> {
        let mut notes = Vec::new();
        for note in self.markdown_files()? {
            let content = self.read(&note).await?;
            let references = match_links(&content).iter().any(|link| {
                self.resolve_link(&link.path, &note.path)
                    .map(|f| f.path == attachment.path)
                    .unwrap_or(false)
            });
            if references {
                notes.push(note);
            }
        }
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_vault() -> (FsVault, TempDir) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("notes/sub")).unwrap();
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::write(root.join("index.md"), "# Index\n![[photo.png]]\n").unwrap();
        std::fs::write(root.join("notes/a.md"), "[pic](../assets/photo.png)").unwrap();
        std::fs::write(root.join("notes/sub/b.md"), "nothing here").unwrap();
        std::fs::write(root.join("assets/photo.png"), b"png-bytes").unwrap();
        std::fs::write(root.join("assets/other.gif"), b"gif").unwrap();
        std::fs::write(root.join(".obsidian/app.md"), "hidden").unwrap();
        (FsVault::new(root), temp)
    }

    #[test]
    fn test_markdown_files_skip_hidden() {
        let (vault, _temp) = create_test_vault();
        let paths: Vec<String> = vault.markdown_files().unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["index.md", "notes/a.md", "notes/sub/b.md"]);
    }

    #[test]
    fn test_markdown_files_in_folder() {
        let (vault, _temp) = create_test_vault();
        let paths: Vec<String> = vault.markdown_files_in("notes").unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["notes/a.md", "notes/sub/b.md"]);
    }

    #[test]
    fn test_folder_files_are_direct_children() {
        let (vault, _temp) = create_test_vault();
        let paths: Vec<String> = vault.folder_files("notes").unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["notes/a.md"]);
    }

    #[test]
    fn test_rejects_paths_outside_vault() {
        let (vault, _temp) = create_test_vault();
        assert!(matches!(vault.file("../etc/passwd"), Err(VaultError::OutsideVault(_))));
    }

    #[test]
    fn test_resolve_link() {
        let (vault, _temp) = create_test_vault();

        let exact = vault.resolve_link("assets/photo.png", "index.md").unwrap();
        assert_eq!(exact.path, "assets/photo.png");

        let relative = vault.resolve_link("../assets/photo.png", "notes/a.md").unwrap();
        assert_eq!(relative.path, "assets/photo.png");

        let by_name = vault.resolve_link("photo.png", "index.md").unwrap();
        assert_eq!(by_name.path, "assets/photo.png");

        let note = vault.resolve_link("b", "index.md").unwrap();
        assert_eq!(note.path, "notes/sub/b.md");

        assert!(vault.resolve_link("missing.png", "index.md").is_none());
        assert!(vault.resolve_link("https://example.com/photo.png", "index.md").is_none());
    }

    #[test]
    fn test_generate_link() {
        let (vault, _temp) = create_test_vault();
        let file = vault.file("assets/photo.png").unwrap().unwrap();
        assert_eq!(vault.generate_link(&file), "[[assets/photo.png]]");

        let vault = vault.with_markdown_links(true);
        let mut spaced = file.clone();
        spaced.path = "my assets/a b.png".to_string();
        assert_eq!(vault.generate_link(&spaced), "[a b.png](my%20assets/a%20b.png)");
    }

    #[tokio::test]
    async fn test_available_attachment_path_numbers_collisions() {
        let (vault, _temp) = create_test_vault();
        let vault = vault.with_attachment_folder("assets");

        let path = vault.available_attachment_path("photo.png", "index.md").await.unwrap();
        assert_eq!(path, "assets/photo 1.png");

        let path = vault.available_attachment_path("new.png", "index.md").await.unwrap();
        assert_eq!(path, "assets/new.png");
    }

    #[tokio::test]
    async fn test_available_attachment_path_relative_to_note() {
        let (vault, _temp) = create_test_vault();
        let vault = vault.with_attachment_folder("./attachments");

        let path = vault.available_attachment_path("x.png", "notes/sub/b.md").await.unwrap();
        assert_eq!(path, "notes/sub/attachments/x.png");
    }

    #[tokio::test]
    async fn test_modify_preserves_mtime() {
        let (vault, _temp) = create_test_vault();
        let note = vault.file("notes/a.md").unwrap().unwrap();

        let old = chrono::DateTime::parse_from_rfc3339("2020-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let stat = FileStat { mtime: old, ..note.stat };
        vault.modify(&note, "changed", Some(&stat)).await.unwrap();

        let reloaded = vault.file("notes/a.md").unwrap().unwrap();
        assert_eq!(vault.read(&reloaded).await.unwrap(), "changed");
        assert_eq!(reloaded.stat.mtime.timestamp(), old.timestamp());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_file() {
        let (vault, _temp) = create_test_vault();
        let result = vault.create("index.md", "x").await;
        assert!(matches!(result, Err(VaultError::AlreadyExists(_))));

        let created = vault.create("new/dir/file.md", "hello").await.unwrap();
        assert_eq!(created.path, "new/dir/file.md");
        assert_eq!(vault.read(&created).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_trash_moves_file() {
        let (vault, temp) = create_test_vault();
        let file = vault.file("assets/photo.png").unwrap().unwrap();
        vault.trash(&file).await.unwrap();

        assert!(vault.file("assets/photo.png").unwrap().is_none());
        assert!(temp.path().join(".trash/photo.png").exists());
    }

    #[tokio::test]
    async fn test_referencing_notes() {
        let (vault, _temp) = create_test_vault();
        let photo = vault.file("assets/photo.png").unwrap().unwrap();
        let notes: Vec<String> = vault
            .referencing_notes(&photo)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.path)
            .collect();
        assert_eq!(notes, vec!["index.md", "notes/a.md"]);

        let gif = vault.file("assets/other.gif").unwrap().unwrap();
        assert!(vault.referencing_notes(&gif).await.unwrap().is_empty());
    }
}
