//! Ports for the drydock orchestrator
//!
//! The engine talks to the outside world only through the traits in this
//! crate: the per-resource [`Provider`] contract, the [`ProviderFactory`]
//! binding resource types to implementations, and the client seams for
//! the container runtime, subprocesses and HTTP checks.

pub mod clients;
pub mod command;
pub mod error;
pub mod factory;
pub mod http;
pub mod provider;
pub mod runtime;

pub use crate::clients::Clients;
pub use crate::command::{CommandOutput, CommandRunner};
pub use crate::error::ClientError;
pub use crate::factory::ProviderFactory;
pub use crate::http::HttpChecker;
pub use crate::provider::{Provider, ProviderError};
pub use crate::runtime::{
    ContainerConfig, ContainerRuntime, LogFrame, LogFrameStream, LogStreamOptions, StreamKind,
};
