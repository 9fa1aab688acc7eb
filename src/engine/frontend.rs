// src/engine/frontend.rs

//! Seams to the collaborators that feed the engine.
//!
//! A [`FrontEnd`] turns some project description into registered actions
//! plus the outputs the caller wants. An [`IterativePass`] inspects the
//! result of a pass and decides whether another one is needed.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::config::Manifest;
use crate::dag::{Action, ActionId, ItemId};
use crate::errors::Result;

use super::session::BuildSession;

/// Registers actions into a session and names the requested outputs.
///
/// Called once per pass, on a freshly reset session.
pub trait FrontEnd {
    fn collect(&mut self, session: &mut BuildSession) -> Result<Vec<ItemId>>;
}

/// Post-pass transformation that may request another pass.
pub trait IterativePass {
    /// `executed` are the actions whose processes ran this pass.
    /// Return `true` to run another pass.
    fn process_next(
        &mut self,
        session: &BuildSession,
        executed: &[ActionId],
        success: bool,
    ) -> Result<bool>;
}

/// The default: a single pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinglePass;

impl IterativePass for SinglePass {
    fn process_next(&mut self, _: &BuildSession, _: &[ActionId], _: bool) -> Result<bool> {
        Ok(false)
    }
}

/// Front end backed by a TOML build manifest.
///
/// Actions run in the manifest's directory unless they set `working_dir`;
/// a relative `working_dir` is resolved against it after `$(NAME)` expansion.
#[derive(Debug, Clone)]
pub struct ManifestFrontEnd {
    manifest: Manifest,
    requested: Vec<String>,
}

impl ManifestFrontEnd {
    pub fn new(manifest: Manifest) -> Self {
        let requested = manifest.outputs.clone();
        Self {
            manifest,
            requested,
        }
    }

    /// Replace the manifest's `outputs` (ignored when empty).
    pub fn with_requested_outputs(mut self, outputs: Vec<String>) -> Self {
        if !outputs.is_empty() {
            self.requested = outputs;
        }
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl FrontEnd for ManifestFrontEnd {
    fn collect(&mut self, session: &mut BuildSession) -> Result<Vec<ItemId>> {
        for generated in &self.manifest.generated {
            session
                .items
                .create_text_file(&generated.path, &generated.content)?;
        }

        let mut all_produced = Vec::new();

        for (name, cfg) in &self.manifest.action {
            let mut action = Action {
                command_path: cfg.command.clone(),
                arguments: cfg.args.clone(),
                working_dir: cfg.working_dir.as_ref().map(PathBuf::from),
                status: cfg.status.clone().unwrap_or_else(|| name.clone()),
                detailed_status: name.clone(),
                remotable: cfg.remotable,
                log_locally: cfg.effective_log_locally(),
                ..Action::default()
            };
            action.prerequisites = cfg.prerequisites.iter().map(|p| session.item(p)).collect();
            action.produced = cfg.produces.iter().map(|p| session.item(p)).collect();
            all_produced.extend(action.produced.iter().copied());

            let id = session.register(action);
            debug!(action = %name, %id, "registered action");
        }

        let outputs = if self.requested.is_empty() {
            let mut seen = HashSet::new();
            all_produced.retain(|item| seen.insert(*item));
            all_produced
        } else {
            self.requested.iter().map(|p| session.item(p)).collect()
        };

        Ok(outputs)
    }
}
