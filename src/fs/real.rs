use super::FileSystem;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pom.xml");
        fs::write(&path, "<project/>").unwrap();

        let fs = RealFileSystem::new();
        assert!(fs.is_dir(dir.path()));
        assert_eq!(fs.read_optional(&path).unwrap().as_deref(), Some("<project/>"));
        assert_eq!(fs.read_optional(&dir.path().join("missing")).unwrap(), None);
    }
}
