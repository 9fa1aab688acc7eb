// src/dag/item.rs

//! FileItem registry: one canonical identity per normalized path, with
//! cached existence / size / modification time.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::dag::action::ActionId;
use crate::errors::Result;
use crate::fs::{FileMeta, FileSystem};

/// Index of a [`FileItem`] inside its [`FileItemRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// A path plus the metadata sampled when it was interned (or last refreshed).
#[derive(Debug, Clone)]
pub struct FileItem {
    pub path: PathBuf,
    meta: Option<FileMeta>,
    /// Set by `ActionGraph::link_producers`.
    producer: Option<ActionId>,
}

impl FileItem {
    pub fn exists(&self) -> bool {
        self.meta.is_some()
    }

    /// Length in bytes, `0` when missing.
    pub fn len(&self) -> u64 {
        self.meta.map(|m| m.len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.meta.map(|m| m.modified)
    }

    pub fn producer(&self) -> Option<ActionId> {
        self.producer
    }

    /// Final path component, for log lines.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Interns paths into [`FileItem`]s.
///
/// Not thread-safe by design of its callers: graph construction and
/// outdated-ness evaluation are single-threaded.
#[derive(Debug)]
pub struct FileItemRegistry {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    case_insensitive: bool,
    items: Vec<FileItem>,
    index: HashMap<String, ItemId>,
}

impl FileItemRegistry {
    /// Relative paths are resolved against `root`.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            case_insensitive: true,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Panics if `id` did not come from this registry (or predates a reset).
    pub fn get(&self, id: ItemId) -> &FileItem {
        &self.items[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &FileItem)> {
        self.items.iter().enumerate().map(|(i, item)| (ItemId(i), item))
    }

    /// Intern `path`, sampling its metadata the first time it is seen.
    pub fn get_or_create(&mut self, path: impl AsRef<Path>) -> ItemId {
        let absolute = normalize_path(&self.root, path.as_ref());
        let key = self.key_for(&absolute);

        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let meta = self.fs.metadata(&absolute);
        let id = ItemId(self.items.len());
        self.items.push(FileItem {
            path: absolute,
            meta,
            producer: None,
        });
        self.index.insert(key, id);
        id
    }

    /// Like [`get_or_create`](Self::get_or_create), but returns `None` when
    /// the file does not exist on disk.
    pub fn get_existing(&mut self, path: impl AsRef<Path>) -> Option<ItemId> {
        let id = self.get_or_create(path);
        if self.get(id).exists() { Some(id) } else { None }
    }

    /// Write `content` to `path` only if it differs from what is on disk.
    ///
    /// Skipping identical writes keeps the modification time stable, so
    /// regenerated-but-unchanged inputs don't make their consumers stale.
    pub fn create_text_file(&mut self, path: impl AsRef<Path>, content: &str) -> Result<ItemId> {
        let id = self.get_or_create(path);
        let path = self.items[id.0].path.clone();

        let unchanged = self.items[id.0].exists()
            && self
                .fs
                .read(&path)
                .map(|existing| existing == content.as_bytes())
                .unwrap_or(false);

        if unchanged {
            debug!(path = %path.display(), "text file unchanged; skipping write");
        } else {
            debug!(path = %path.display(), "writing text file");
            self.fs.write(&path, content.as_bytes())?;
            self.refresh(id);
        }

        Ok(id)
    }

    /// Re-sample the metadata of one item.
    pub fn refresh(&mut self, id: ItemId) {
        let item = &mut self.items[id.0];
        item.meta = self.fs.metadata(&item.path);
    }

    /// Drop every interned item so the next pass observes current disk state.
    ///
    /// Existing `ItemId`s become invalid.
    pub fn reset(&mut self) {
        debug!(items = self.items.len(), "resetting file item registry");
        self.items.clear();
        self.index.clear();
    }

    /// Record `action` as the producer of `id`, returning the previous one.
    pub(crate) fn set_producer(&mut self, id: ItemId, action: ActionId) -> Option<ActionId> {
        self.items[id.0].producer.replace(action)
    }

    pub(crate) fn clear_producers(&mut self) {
        for item in &mut self.items {
            item.producer = None;
        }
    }

    fn key_for(&self, absolute: &Path) -> String {
        let key = absolute.to_string_lossy().replace('\\', "/");
        if self.case_insensitive {
            key.to_lowercase()
        } else {
            key
        }
    }
}

/// Make `path` absolute against `root` and fold `.` / `..` lexically.
///
/// The file does not need to exist, so this never touches the filesystem.
pub fn normalize_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
