//! An ordered collection of resources, unique by FQDN

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::resource::{parse_reference, Resource, ResourceType};
use crate::status::Status;

/// The resources of one run, in declaration order. Uniqueness is by FQDN:
/// two resources may share a name as long as their types differ.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.iter_mut()
    }

    pub fn contains(&self, fqdn: &str) -> bool {
        self.resources.iter().any(|r| r.fqdn() == fqdn)
    }

    /// Add a resource, rejecting FQDN collisions.
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        let fqdn = resource.fqdn();
        if self.contains(&fqdn) {
            return Err(CoreError::Duplicate(fqdn));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Find by a `<type>.<name>` reference.
    pub fn find_resource(&self, reference: &str) -> Result<&Resource> {
        let (rtype, name) = parse_reference(reference)?;
        self.resources
            .iter()
            .find(|r| r.rtype == rtype && r.name == name)
            .ok_or_else(|| CoreError::NotFound(reference.to_string()))
    }

    /// Find a resource another resource depends on. Same lookup as
    /// [`find_resource`](Self::find_resource), but a miss is reported as
    /// a dangling dependency rather than a plain not-found.
    pub fn find_dependent_resource(&self, reference: &str) -> Result<&Resource> {
        self.find_resource(reference).map_err(|err| match err {
            CoreError::NotFound(r) => {
                CoreError::Validation(format!("dependency '{r}' is not declared"))
            }
            other => other,
        })
    }

    pub fn find_by_fqdn(&self, fqdn: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.fqdn() == fqdn)
    }

    pub fn resource_count_for_type(&self, rtype: ResourceType) -> usize {
        self.resources.iter().filter(|r| r.rtype == rtype).count()
    }

    pub fn set_status(&mut self, fqdn: &str, status: Status) {
        if let Some(r) = self.resources.iter_mut().find(|r| r.fqdn() == fqdn) {
            r.status = status;
        }
    }

    /// Drop a resource after a successful destroy.
    pub fn remove(&mut self, fqdn: &str) {
        self.resources.retain(|r| r.fqdn() != fqdn);
    }
}

impl IntoIterator for ResourceSet {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}
