//! Domain core for the drydock orchestrator
//!
//! This crate contains the resource model, the status lifecycle, and the
//! home-directory layout. It has no dependency on the runtime, the clients,
//! or the engine.

pub mod blueprint;
pub mod error;
pub mod paths;
pub mod resource;
pub mod resource_set;
pub mod specs;
pub mod status;

pub use crate::blueprint::Blueprint;
pub use crate::error::{CoreError, Result};
pub use crate::resource::{parse_reference, strip_fqdn_suffix, Resource, ResourceType, FQDN_SUFFIX};
pub use crate::resource_set::ResourceSet;
pub use crate::status::{apply_action, destroy_action, Action, Status};
