// src/engine/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::dag::{Action, ActionGraph, ActionId, FileItemRegistry, ItemId};
use crate::fs::FileSystem;

/// Everything one build owns: the interned items and the registered actions.
///
/// Sessions are independent of each other; nothing is process-global except
/// the orchestrator's run lock.
#[derive(Debug)]
pub struct BuildSession {
    pub items: FileItemRegistry,
    pub graph: ActionGraph,
}

impl BuildSession {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            items: FileItemRegistry::new(fs, root),
            graph: ActionGraph::new(),
        }
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.items = self.items.with_case_insensitive(case_insensitive);
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        self.items.fs()
    }

    pub fn root(&self) -> &Path {
        self.items.root()
    }

    /// Shorthand for `items.get_or_create`.
    pub fn item(&mut self, path: impl AsRef<Path>) -> ItemId {
        self.items.get_or_create(path)
    }

    /// Shorthand for `graph.register`.
    pub fn register(&mut self, action: Action) -> ActionId {
        self.graph.register(action)
    }

    /// Forget all items and actions ahead of a new pass.
    pub fn reset(&mut self) {
        debug!(actions = self.graph.len(), "resetting build session");
        self.items.reset();
        self.graph.clear();
    }

    /// Re-sample the produced items of `actions` after they ran.
    pub fn refresh_produced(&mut self, actions: &[ActionId]) {
        for &id in actions {
            for &item in &self.graph.get(id).produced {
                self.items.refresh(item);
            }
        }
    }
}
