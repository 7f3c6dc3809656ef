//! # droplet-builder
//!
//! Turns the typed instructions of one Dropletfile stage into lines of
//! shell script.
//!
//! Handles:
//! - **Builder**: the per-instruction generator trait and stage dispatch.
//! - **Local**: the generator driven by `builder.local.*` configuration.
//! - **Package managers**: command tables for `package` instructions.

pub mod builder;
pub mod error;
pub mod package_manager;

pub use crate::builder::{Builder, build_stage};
pub use crate::error::{BuildError, Result};
