//! Client bundle handed to the provider factory

use std::sync::Arc;

use crate::command::CommandRunner;
use crate::http::HttpChecker;
use crate::runtime::ContainerRuntime;

/// Everything a provider may need to act on the outside world. Built
/// once at startup and shared; providers are stateless per call.
#[derive(Clone)]
pub struct Clients {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub command: Arc<dyn CommandRunner>,
    pub http: Arc<dyn HttpChecker>,
}
