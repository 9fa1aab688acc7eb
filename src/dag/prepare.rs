// src/dag/prepare.rs

//! Pre-dispatch housekeeping: output directories and stale-output eviction.
//!
//! Runs single-threaded before any process launches. Both steps are
//! idempotent: running them twice changes nothing the second time.

use std::collections::HashSet;

use tracing::debug;

use crate::dag::action::ActionId;
use crate::dag::graph::ActionGraph;
use crate::dag::item::FileItemRegistry;
use crate::errors::Result;

/// What housekeeping did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrepareStats {
    pub directories_created: usize,
    pub items_deleted: usize,
}

/// Create parent directories for every produced item of `actions` and,
/// if `delete_outdated` is set, delete the produced items that exist.
pub fn prepare_outputs(
    graph: &ActionGraph,
    items: &mut FileItemRegistry,
    actions: &[ActionId],
    delete_outdated: bool,
) -> Result<PrepareStats> {
    let mut stats = PrepareStats::default();
    let fs = items.fs().clone();
    let mut checked_dirs = HashSet::new();

    for &id in actions {
        for &produced in &graph.get(id).produced {
            let item = items.get(produced);

            if delete_outdated && item.exists() {
                debug!(path = %item.path.display(), "deleting outdated item");
                fs.remove_file(&item.path)?;
                items.refresh(produced);
                stats.items_deleted += 1;
            }

            let Some(dir) = items.get(produced).path.parent().map(|p| p.to_path_buf()) else {
                continue;
            };
            if !checked_dirs.insert(dir.clone()) {
                continue;
            }
            if !fs.is_dir(&dir) {
                debug!(dir = %dir.display(), "creating directory for produced item");
                fs.create_dir_all(&dir)?;
                stats.directories_created += 1;
            }
        }
    }

    Ok(stats)
}
