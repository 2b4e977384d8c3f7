//! The drydock orchestration engine
//!
//! Turns a parsed resource set plus the persisted prior state into a
//! correctly ordered, parallel execution of create and destroy actions,
//! with per-resource status tracking and recovery from partial failures.
//! Also home to the log multiplexer that tails container output.

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logs;
pub mod merge;
pub mod state;

pub use crate::config::{load_config, load_config_with_variables, ParsedConfig};
pub use crate::engine::{Engine, EngineConfig, IMAGE_CACHE_NAME};
pub use crate::error::{EngineError, Result};
pub use crate::graph::{ResourceGraph, WalkOptions, WalkReport};
pub use crate::logs::LogMultiplexer;
pub use crate::merge::merge;
pub use crate::state::StateDocument;
