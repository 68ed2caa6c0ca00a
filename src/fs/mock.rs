use super::{FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MockEntry {
    content: Option<String>,
    file_type: FileType,
}

/// In-memory file system. Relative paths live under `/mock`.
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            root: PathBuf::from("/mock"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.write();

        if let Some(parent) = path.parent() {
            ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
            },
        );
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.write().unwrap_or_else(|e| e.into_inner())
    }

    fn file_type(&self, path: &Path) -> Option<FileType> {
        let path = self.normalize_path(path);
        self.read().get(&path).map(|entry| entry.file_type)
    }
}

fn ensure_parents(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        files.entry(current.clone()).or_insert(MockEntry {
            content: None,
            file_type: FileType::Directory,
        });
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.file_type(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.file_type(path) == Some(FileType::Directory)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.file_type(path) == Some(FileType::File)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let normalized = self.normalize_path(path);
        self.read()
            .get(&normalized)
            .and_then(|entry| entry.content.clone())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }
}
