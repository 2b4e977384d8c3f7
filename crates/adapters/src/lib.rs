//! Client adapters and providers for drydock
//!
//! The concrete side of the ports: a Docker-backed container runtime, a
//! tokio subprocess runner, a reqwest health checker, the per-type
//! resource providers, and the factory that binds a resource type to
//! its provider.

pub mod command;
pub mod docker;
pub mod factory;
pub mod http;
pub mod providers;

pub use crate::command::TokioCommandRunner;
pub use crate::docker::DockerRuntime;
pub use crate::factory::{new_clients, DefaultProviderFactory};
pub use crate::http::ReqwestChecker;
