use super::{FileMeta, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
struct MockFile {
    content: Vec<u8>,
    modified: u64,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockFile>,
    dirs: HashSet<PathBuf>,
    /// Logical clock in seconds; every write without an explicit time ticks it.
    clock: u64,
}

/// In-memory filesystem with a logical clock.
///
/// Clones share the same state, so a test can keep a handle while the
/// registry owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.state.lock().unwrap().clock = 1_000;
        fs
    }

    /// Add (or replace) a file with an explicit modification time in seconds.
    pub fn add_file_at(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>, modified: u64) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock().unwrap();
        state.clock = state.clock.max(modified);
        register_parents(&mut state.dirs, &path);
        state.files.insert(
            path,
            MockFile {
                content: content.into(),
                modified,
            },
        );
    }

    /// Add (or replace) a file, ticking the logical clock.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let tick = self.tick();
        self.add_file_at(path, content, tick);
    }

    /// Bump the modification time without changing content.
    pub fn touch(&self, path: impl AsRef<Path>) -> bool {
        let tick = self.tick();
        let mut state = self.state.lock().unwrap();
        match state.files.get_mut(path.as_ref()) {
            Some(file) => {
                file.modified = tick;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().files.contains_key(path.as_ref())
    }

    pub fn modified_secs(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|f| f.modified)
    }

    fn tick(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        state.clock
    }
}

fn register_parents(dirs: &mut HashSet<PathBuf>, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() || !dirs.insert(dir.to_path_buf()) {
            break;
        }
        current = dir.parent();
    }
}

fn to_system_time(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

impl FileSystem for MockFileSystem {
    fn metadata(&self, path: &Path) -> Option<FileMeta> {
        let state = self.state.lock().unwrap();
        state.files.get(path).map(|f| FileMeta {
            len: f.content.len() as u64,
            modified: to_system_time(f.modified),
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.dirs.insert(path.to_path_buf());
        register_parents(&mut state.dirs, path);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }
}
