//! File loading for the guest.
//!
//! `fs_load_file` hands out an id immediately and delegates the fetch to a
//! [`FileFetcher`]. The fetcher completes through a [`FetchReply`], usually from
//! another thread; the session applies the outcome to the [`FileStore`] and then
//! calls the guest's `file_loaded(id)`.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::state::{Completion, CompletionSender};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("refusing to load {0}: path escapes the asset root")]
    RejectedPath(String),

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// One-shot completion handle for a fetch.
#[derive(Debug)]
pub struct FetchReply {
    file_id: u32,
    sender: CompletionSender,
}

impl FetchReply {
    pub fn new(file_id: u32, sender: CompletionSender) -> Self {
        Self { file_id, sender }
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    pub fn complete(self, result: Result<Vec<u8>, FetchError>) {
        self.sender.send(Completion::FileFetched {
            file_id: self.file_id,
            result,
        });
    }
}

/// Source of file bytes (network, asset directory, archive...).
pub trait FileFetcher {
    /// Start fetching `path`. `reply` must be completed exactly once.
    fn fetch(&mut self, path: &str, reply: FetchReply);
}

#[derive(Debug)]
enum FileSlot {
    Pending,
    Loaded(Vec<u8>),
    Failed,
}

/// Outcome of every file the guest asked for, keyed by file id.
#[derive(Debug, Default)]
pub struct FileStore {
    next_id: u32,
    files: HashMap<u32, FileSlot>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next file id (ids start at 0).
    pub fn begin(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.files.insert(id, FileSlot::Pending);
        id
    }

    /// Record a fetch outcome. Returns false when the id is unknown or already settled.
    pub fn complete(&mut self, file_id: u32, result: Result<Vec<u8>, FetchError>) -> bool {
        let Some(slot) = self.files.get_mut(&file_id) else {
            return false;
        };
        if !matches!(slot, FileSlot::Pending) {
            return false;
        }
        *slot = match result {
            Ok(bytes) => FileSlot::Loaded(bytes),
            Err(err) => {
                tracing::error!(file_id, "file fetch failed: {err}");
                FileSlot::Failed
            }
        };
        true
    }

    /// Byte length of a loaded file; -1 when pending, failed or already taken.
    pub fn buffer_size(&self, file_id: u32) -> i32 {
        match self.files.get(&file_id) {
            Some(FileSlot::Loaded(bytes)) => i32::try_from(bytes.len()).unwrap_or(i32::MAX),
            _ => -1,
        }
    }

    /// Remove and return the bytes of a loaded file.
    pub fn take(&mut self, file_id: u32) -> Option<Vec<u8>> {
        match self.files.remove(&file_id) {
            Some(FileSlot::Loaded(bytes)) => Some(bytes),
            Some(other) => {
                self.files.insert(file_id, other);
                None
            }
            None => None,
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Reads files relative to a root directory on a worker thread.
#[derive(Clone, Debug)]
pub struct LocalFileFetcher {
    root: PathBuf,
}

impl LocalFileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `request` under the root, rejecting absolute paths and `..`.
    pub fn resolve(&self, request: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(request.trim_start_matches("./"));
        let mut resolved = self.root.clone();
        let mut parts = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(FetchError::RejectedPath(request.to_owned()));
                }
            }
        }
        if parts == 0 {
            return Err(FetchError::RejectedPath(request.to_owned()));
        }
        Ok(resolved)
    }
}

fn read_file(path: &Path, request: &str) -> Result<Vec<u8>, FetchError> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FetchError::NotFound(request.to_owned())
        } else {
            FetchError::Io {
                path: request.to_owned(),
                source,
            }
        }
    })
}

impl FileFetcher for LocalFileFetcher {
    fn fetch(&mut self, path: &str, reply: FetchReply) {
        let resolved = match self.resolve(path) {
            Ok(resolved) => resolved,
            Err(err) => {
                reply.complete(Err(err));
                return;
            }
        };
        let request = path.to_owned();
        let file_id = reply.file_id();
        // A failed spawn drops the reply; the file then stays pending.
        let spawned = std::thread::Builder::new()
            .name(format!("fetch-file-{file_id}"))
            .spawn(move || {
                let result = read_file(&resolved, &request);
                reply.complete(result);
            });
        if let Err(err) = spawned {
            tracing::error!(file_id, "failed to spawn fetch thread: {err}");
        }
    }
}

/// Serves files from a map and completes synchronously.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }
}

impl FileFetcher for InMemoryFetcher {
    fn fetch(&mut self, path: &str, reply: FetchReply) {
        let result = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_owned()));
        reply.complete(result);
    }
}
