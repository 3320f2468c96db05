//! Shared fixtures for unit tests: an in-memory WebDAV server and a vault in a
//! temporary directory.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::settings::Settings;
use crate::sync::SyncContext;
use crate::vault::{FsVault, Vault, VaultFile};
use crate::webdav::{HttpRequest, HttpResponse, HttpTransport, RemoteStore, WebDAVError};

pub(crate) const BASE_URL: &str = "https://dav.example.com/files";

#[derive(Default)]
struct DavState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    strict_dirs: bool,
    scripted: VecDeque<(String, u16)>,
    requests: Vec<HttpRequest>,
}

/// Records every request and serves files from memory
pub(crate) struct FakeDav {
    base: String,
    state: Mutex<DavState>,
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

impl FakeDav {
    pub(crate) fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            state: Mutex::new(DavState::default()),
        }
    }

    /// Answer PUT and MKCOL with 409 when the parent collection is missing
    pub(crate) fn require_directories(&self) {
        self.state.lock().unwrap().strict_dirs = true;
    }

    /// Answer the next `method` request with `status` instead of serving it
    pub(crate) fn respond_next(&self, method: &str, status: u16) {
        self.state.lock().unwrap().scripted.push_back((method.to_string(), status));
    }

    pub(crate) fn insert(&self, path: &str, data: &[u8]) {
        self.state.lock().unwrap().files.insert(path.to_string(), data.to_vec());
    }

    pub(crate) fn insert_dir(&self, path: &str) {
        self.state.lock().unwrap().dirs.insert(path.to_string());
    }

    pub(crate) fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.state.lock().unwrap().requests.iter().filter(|r| r.method == method).count()
    }

    fn path_of(&self, url: &str) -> String {
        let path = url.strip_prefix(&self.base).unwrap_or(url);
        urlencoding::decode(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string())
    }
}

#[async_trait]
impl HttpTransport for FakeDav {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, WebDAVError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.requests.push(request.clone());

        if let Some(idx) = state.scripted.iter().position(|(m, _)| *m == request.method) {
            let (_, status) = state.scripted.remove(idx).unwrap();
            return Ok(HttpResponse::new(status, format!("scripted {}", status)));
        }

        let path = self.path_of(&request.url);
        let parent_missing = |state: &DavState, path: &str| {
            let parent = parent(path);
            state.strict_dirs && !parent.is_empty() && !state.dirs.contains(parent)
        };

        let response = match request.method.as_str() {
            "PUT" if parent_missing(state, &path) => HttpResponse::new(409, "Conflict"),
            "PUT" => {
                state.files.insert(path, request.body.unwrap_or_default());
                HttpResponse::new(201, "")
            }
            "GET" => match state.files.get(&path) {
                Some(data) => HttpResponse::new(200, data.clone()),
                None => HttpResponse::new(404, "Not Found"),
            },
            "DELETE" => match state.files.remove(&path) {
                Some(_) => HttpResponse::new(204, ""),
                None => HttpResponse::new(404, "Not Found"),
            },
            "MKCOL" if state.dirs.contains(&path) => HttpResponse::new(405, "Method Not Allowed"),
            "MKCOL" if parent_missing(state, &path) => HttpResponse::new(409, "Conflict"),
            "MKCOL" => {
                state.dirs.insert(path);
                HttpResponse::new(201, "")
            }
            "MOVE" => {
                let destination = request.header_value("Destination").map(|d| self.path_of(d));
                match (state.files.remove(&path), destination) {
                    (Some(data), Some(destination)) => {
                        state.files.insert(destination, data);
                        HttpResponse::new(201, "")
                    }
                    (Some(data), None) => {
                        state.files.insert(path, data);
                        HttpResponse::new(400, "Missing Destination")
                    }
                    (None, _) => HttpResponse::new(404, "Not Found"),
                }
            }
            "PROPFIND" => HttpResponse::new(207, "<multistatus/>"),
            _ => HttpResponse::new(405, "Method Not Allowed"),
        };
        Ok(response)
    }
}

/// A vault in a temp directory wired to a [`FakeDav`]
pub(crate) struct Fixture {
    _dir: TempDir,
    pub(crate) root: PathBuf,
    pub(crate) vault: FsVault,
    pub(crate) store: RemoteStore,
    pub(crate) settings: Settings,
    pub(crate) server: Arc<FakeDav>,
}

impl Fixture {
    pub(crate) fn settings() -> Settings {
        Settings {
            url: BASE_URL.to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
            create_batch_log: false,
            ..Settings::default()
        }
    }

    pub(crate) fn new() -> Self {
        Self::with_settings(Self::settings())
    }

    pub(crate) fn with_settings(settings: Settings) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let server = Arc::new(FakeDav::new(BASE_URL));
        let store = RemoteStore::from_settings(&settings, server.clone()).unwrap();

        Self {
            _dir: dir,
            vault: FsVault::new(&root),
            root,
            store,
            settings,
            server,
        }
    }

    pub(crate) fn ctx(&self) -> SyncContext<'_> {
        SyncContext::new(&self.settings, &self.vault, &self.store)
    }

    pub(crate) fn write(&self, path: &str, data: &[u8]) {
        let abs = self.root.join(path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(abs, data).unwrap();
    }

    /// Write a note and return its vault handle
    pub(crate) fn note(&self, path: &str, content: &str) -> VaultFile {
        self.write(path, content.as_bytes());
        self.vault.file(path).unwrap().unwrap()
    }

    pub(crate) fn read(&self, path: &str) -> String {
        String::from_utf8_lossy(&std::fs::read(self.root.join(path)).unwrap()).into_owned()
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        self.root.join(path).exists()
    }
}
