//! # renderload core
//!
//! Query generation for synthetic read load against a Graphite-style `/render` API.
//!
//! This crate provides the building blocks the load engine consumes:
//! - `TargetCatalog` - immutable, ordered list of targets loaded once per run
//! - `CyclicQueryGenerator` - lock-free round-robin query factory shared by a group's workers
//! - `QueryGroup` / `RunPlan` - the assembled set of groups handed to the engine
//! - `RunConfig` - user-facing configuration (presets, TOML file, overrides)
//!
//! ## Data flow
//!
//! ```text
//!   targets.csv ──► TargetCatalog ──┬──► generator("1 Hour") ──► QueryGroup ──┐
//!                                   ├──► generator("1 Day")  ──► QueryGroup ──┼──► RunPlan ──► engine
//!                                   └──► generator(...)      ──► QueryGroup ──┘
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod offsets;
pub mod plan;
pub mod query;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use generator::*;
pub use offsets::*;
pub use plan::*;
pub use query::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::TargetCatalog;
    pub use crate::config::{Preset, RunConfig, WindowSpec};
    pub use crate::error::{RenderLoadError, Result};
    pub use crate::generator::CyclicQueryGenerator;
    pub use crate::plan::{QueryGroup, RunPlan};
    pub use crate::query::{Query, QueryMethod, RenderFormat};
}
