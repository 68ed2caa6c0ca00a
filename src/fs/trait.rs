use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// Read-only view of a build context
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Read `path` if it is a regular file, `None` when it does not exist
    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        if self.is_file(path) {
            self.read_to_string(path).map(Some)
        } else {
            Ok(None)
        }
    }
}
