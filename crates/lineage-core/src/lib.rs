#![forbid(unsafe_code)]
//! lineage-core library.
//!
//! Data model and graph construction for lineage lane layout: entities and
//! events, succession chains, the parent/child relation index, families, and
//! the layout configuration.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` for IO-facing functions; [`ConfigError`]
//!   for configuration validation. Graph construction is infallible.
//! - **Logging**: `tracing` macros; pipeline entry points are instrumented.

pub mod chain;
pub mod config;
pub mod error;
pub mod family;
pub mod graph;
pub mod model;
pub mod relations;

pub use chain::{Chain, ChainIdx, build_chains};
pub use config::{
    CostWeights, GroupwiseConfig, LayoutConfig, Phase, SearchConfig, Strategy, default_schedule,
    load_layout_config,
};
pub use error::ConfigError;
pub use family::{Family, build_families};
pub use graph::{LineageGraph, LineageInput, content_hash, load_input};
pub use model::{Entity, Era, Event, EventKind};
pub use relations::Relations;
