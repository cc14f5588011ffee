/// Output sinks
///
/// The driver hands finished modules to an [`OutputSink`]. [`FsSink`] writes
/// to disk; [`MemorySink`] keeps them in memory for tests and dry runs.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for generated files
pub trait OutputSink {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Writes files to the file system, creating parent directories.
///
/// Contents go to a temporary sibling first and are renamed into place, so a
/// failed write never leaves a truncated module behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(contents.as_bytes())?;
        if let Ok(existing) = std::fs::metadata(path) {
            file.as_file().set_permissions(existing.permissions())?;
        }
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Records writes in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far, ordered by path
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        self.files
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().remove(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("memory sink lock poisoned"))?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
