//! gridconf - Grid-search configuration expansion
//!
//! This crate expands an experiment configuration document into every
//! concrete hyperparameter combination it describes. The `grid` section
//! of the document is the search space; the remaining top-level fields
//! are shared metadata, type-checked once and injected into each
//! expanded configuration.

pub mod config;
pub mod error;
pub mod grid;
pub mod manifest;

pub use config::{ExperimentConfig, SourceInfo};
pub use error::GridError;
pub use grid::{expand, ClassSpec, Grid, ResolvedConfig, SharedMetadata};
pub use manifest::ExpansionManifest;
