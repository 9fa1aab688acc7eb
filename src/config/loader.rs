// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{BuildError, Result};

/// Load a manifest from a given path and return the raw `RawManifest`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => {
            BuildError::ConfigError(format!("manifest not found: {}", path.display()))
        }
        _ => BuildError::IoError(err),
    })?;

    let manifest: RawManifest = toml::from_str(&contents)?;

    Ok(manifest)
}

/// Load a manifest from path and validate it.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks basic sanity (at least one action, positive budget, required
///   environment variables).
/// - Records the manifest's directory as the root for relative paths.
///
/// Graph-level problems (cycles, conflicting producers) are detected later,
/// when the actions are linked.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    let manifest = Manifest::try_from(raw)?;
    Ok(manifest.with_root(manifest_root_dir(path.as_ref())))
}

/// The directory containing the manifest.
///
/// A bare filename like "Build.toml" (parent = "") resolves to the current
/// working directory.
pub fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    let parent = match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if parent.is_absolute() {
        return parent;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(parent),
        Err(_) => parent,
    }
}
