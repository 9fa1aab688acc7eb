#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use buildgraph::config::{
    ActionConfig, BuildSection, DistributedSection, GeneratedFile, Manifest, RawManifest,
};
use buildgraph::dag::{Action, ActionId};
use buildgraph::engine::BuildSession;
use buildgraph::fs::mock::MockFileSystem;

/// Root every mock session is anchored at.
pub const ROOT: &str = "/work";

/// Absolute path under [`ROOT`].
pub fn path(rel: &str) -> String {
    format!("{ROOT}/{rel}")
}

/// Builder for a `BuildSession` over a `MockFileSystem`.
pub struct SessionBuilder {
    fs: MockFileSystem,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
        }
    }

    /// Add a file (relative to [`ROOT`]) at the next tick of the mock clock.
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.fs.add_file(path(rel), content);
        self
    }

    /// Add a file with an explicit modification time.
    pub fn file_at(self, rel: &str, content: &str, secs: u64) -> Self {
        self.fs.add_file_at(path(rel), content, secs);
        self
    }

    /// The session plus a handle sharing the same mock state.
    pub fn build(self) -> (BuildSession, MockFileSystem) {
        let session = BuildSession::new(Arc::new(self.fs.clone()), ROOT);
        (session, self.fs)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register an action running `command` that reads `prerequisites` and
/// writes `produced` (paths relative to the session root).
pub fn add_action(
    session: &mut BuildSession,
    command: &str,
    prerequisites: &[&str],
    produced: &[&str],
) -> ActionId {
    let mut action = Action::new(command).with_status(command);
    for p in prerequisites {
        action = action.with_prerequisite(session.item(p));
    }
    for p in produced {
        action = action.with_produced(session.item(p));
    }
    session.register(action)
}

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    raw: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawManifest {
                outputs: Vec::new(),
                config: BuildSection::default(),
                distributed: DistributedSection::default(),
                generated: Vec::new(),
                action: BTreeMap::new(),
            },
        }
    }

    pub fn with_action(mut self, name: &str, action: ActionConfig) -> Self {
        self.raw.action.insert(name.to_string(), action);
        self
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.raw.outputs.push(output.to_string());
        self
    }

    pub fn with_generated(mut self, path: &str, content: &str) -> Self {
        self.raw.generated.push(GeneratedFile {
            path: path.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut BuildSection)) -> Self {
        f(&mut self.raw.config);
        self
    }

    pub fn with_distributed(mut self, f: impl FnOnce(&mut DistributedSection)) -> Self {
        f(&mut self.raw.distributed);
        self
    }

    pub fn raw(self) -> RawManifest {
        self.raw
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.raw)
            .expect("Failed to build valid manifest from builder")
            .with_root(ROOT)
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            action: ActionConfig {
                command: Some(command.to_string()),
                ..ActionConfig::default()
            },
        }
    }

    /// An action without a command.
    pub fn bookkeeping() -> Self {
        Self {
            action: ActionConfig::default(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.action.args.push(arg.to_string());
        self
    }

    pub fn prerequisite(mut self, path: &str) -> Self {
        self.action.prerequisites.push(path.to_string());
        self
    }

    pub fn produces(mut self, path: &str) -> Self {
        self.action.produces.push(path.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.action.status = Some(status.to_string());
        self
    }

    pub fn working_dir(mut self, dir: &str) -> Self {
        self.action.working_dir = Some(dir.to_string());
        self
    }

    pub fn remotable(mut self, remotable: bool) -> Self {
        self.action.remotable = remotable;
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}
