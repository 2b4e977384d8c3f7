//! Three-way merge of parsed config and prior state
//!
//! Inputs: the declaration (desired), the prior snapshot (actual) and the
//! per-resource disabled override. The result is a new set; nothing is
//! mutated in place. Status decisions here only stage the walk — the
//! orchestrator is the one that acts on them.

use drydock_core::{Resource, ResourceSet, Status};

/// Merge a freshly parsed set with the prior state.
///
/// - present in both: the declaration wins for the payload, but prior
///   attributes it does not mention are preserved; the prior status is
///   inherited unless the declared payload differs, which stages a
///   destroy-and-recreate via `pending_modification`.
/// - only in prior: kept as-is, so an interrupted run can resume and a
///   removed declaration is still torn down by destroy.
/// - only in parsed: starts at `pending_creation`.
/// - disabled in either input: forced to `disabled`.
pub fn merge(parsed: ResourceSet, prior: &ResourceSet) -> ResourceSet {
    let mut merged = ResourceSet::new();

    for mut resource in parsed {
        let fqdn = resource.fqdn();

        if let Some(previous) = prior.find_by_fqdn(&fqdn) {
            resource.prior_status = Some(previous.status);

            let changed = payload_changed(&resource, previous);

            // keep prior attributes the declaration does not overwrite
            let mut payload = previous.payload.clone();
            for (key, value) in std::mem::take(&mut resource.payload) {
                payload.insert(key, value);
            }
            resource.payload = payload;

            resource.status = if changed {
                Status::PendingModification
            } else {
                previous.status
            };

            resource.disabled = resource.disabled || previous.disabled;
        }

        if resource.disabled {
            resource.status = Status::Disabled;
        }

        // duplicates were rejected at parse time
        let _ = merged.add(resource);
    }

    for previous in prior.iter() {
        if merged.contains(&previous.fqdn()) {
            continue;
        }

        let mut resource = previous.clone();
        resource.prior_status = Some(previous.status);
        if resource.disabled {
            resource.status = Status::Disabled;
        }
        let _ = merged.add(resource);
    }

    merged
}

/// A declaration changed its payload when any key it declares is absent
/// from, or different in, the prior payload. Keys only the prior side
/// carries (values written back by providers) do not count.
fn payload_changed(parsed: &Resource, prior: &Resource) -> bool {
    parsed
        .payload
        .iter()
        .any(|(key, value)| prior.payload.get(key) != Some(value))
}
