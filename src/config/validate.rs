// src/config/validate.rs

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{BuildError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = BuildError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw))
    }
}

fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_actions(raw)?;
    validate_build_section(raw)?;
    validate_required_env(raw)?;
    validate_actions(raw)?;
    validate_generated(raw)?;
    validate_distributed(raw)?;
    Ok(())
}

fn ensure_has_actions(raw: &RawManifest) -> Result<()> {
    if raw.action.is_empty() {
        return Err(BuildError::ConfigError(
            "manifest must contain at least one [action.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_build_section(raw: &RawManifest) -> Result<()> {
    let multiplier = raw.config.concurrency_multiplier;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(BuildError::ConfigError(format!(
            "[config].concurrency_multiplier must be > 0 (got {multiplier})"
        )));
    }

    if raw.config.jobs == Some(0) {
        return Err(BuildError::ConfigError(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_required_env(raw: &RawManifest) -> Result<()> {
    for name in &raw.config.required_env {
        match std::env::var_os(name) {
            Some(value) if !value.is_empty() => {}
            _ => {
                return Err(BuildError::ConfigError(format!(
                    "required environment variable '{name}' is not set"
                )));
            }
        }
    }
    Ok(())
}

fn validate_actions(raw: &RawManifest) -> Result<()> {
    for (name, action) in &raw.action {
        if let Some(command) = &action.command {
            if command.trim().is_empty() {
                return Err(BuildError::ConfigError(format!(
                    "action '{name}' has an empty `command`"
                )));
            }
        }
        if action.command.is_none() && !action.args.is_empty() {
            return Err(BuildError::ConfigError(format!(
                "action '{name}' has `args` but no `command`"
            )));
        }
        if action.produces.iter().any(|p| p.trim().is_empty())
            || action.prerequisites.iter().any(|p| p.trim().is_empty())
        {
            return Err(BuildError::ConfigError(format!(
                "action '{name}' lists an empty path"
            )));
        }
    }
    Ok(())
}

fn validate_generated(raw: &RawManifest) -> Result<()> {
    if raw.generated.iter().any(|g| g.path.trim().is_empty()) {
        return Err(BuildError::ConfigError(
            "[[generated]] entries need a non-empty `path`".to_string(),
        ));
    }
    Ok(())
}

fn validate_distributed(raw: &RawManifest) -> Result<()> {
    if raw.distributed.enabled && raw.distributed.engine.trim().is_empty() {
        return Err(BuildError::ConfigError(
            "[distributed].engine must be set when distributed execution is enabled".to_string(),
        ));
    }
    Ok(())
}
