// src/config/mod.rs

//! Build manifest loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ActionConfig, BuildSection, DistributedSection, GeneratedFile, Manifest, RawManifest,
};
