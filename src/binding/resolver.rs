// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of a component's required capabilities to concrete capabilities.
//!
//! Resolving never writes: it reports what the binding should be and leaves
//! persisting parameter merges and auto-bound names to the caller.

use super::CapabilitySelector;
use crate::constants::CAPABILITY_PARAMETER_PREFIX;
use crate::error::{ContractViolation, HalkyonError, Result};
use crate::kubernetes::object::{api_resource, from_dynamic, to_dynamic};
use crate::kubernetes::store::{fetch, list};
use crate::kubernetes::ObjectStore;
use crate::types::{Capability, ComponentSpec, NameValuePair, RequiredCapabilityConfig};
use kube::ResourceExt;
use tracing::{debug, info, instrument};

/// A requirement satisfied by an existing capability
#[derive(Clone, Debug)]
pub struct Binding {
    /// The capability, with the requirement parameters merged in
    pub capability: Capability,
    /// The merge changed the capability parameters
    pub parameters_changed: bool,
    /// Set when the capability was picked by auto-binding
    pub bound_to: Option<String>,
}

impl Binding {
    /// Persist merged parameters on the capability, if any changed
    pub async fn persist_parameters(&mut self, store: &dyn ObjectStore) -> Result<()> {
        if !self.parameters_changed {
            return Ok(());
        }
        let updated = store
            .update(&api_resource::<Capability>(), &to_dynamic(&self.capability)?)
            .await?;
        info!(
            "Updated parameters of capability '{}'",
            self.capability.name_any()
        );
        self.capability = from_dynamic(&updated)?;
        self.parameters_changed = false;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum Resolution {
    Bound(Binding),
    /// Nothing to bind to yet, with a message explaining why
    Unbound(String),
    /// The requirement can't be satisfied until a spec changes
    Violation(ContractViolation),
}

impl Resolution {
    /// The bound capability, or the reason there is none as an error
    pub fn into_capability(self) -> Result<Capability> {
        match self {
            Resolution::Bound(binding) => Ok(binding.capability),
            Resolution::Unbound(message) => Err(HalkyonError::CapabilityUnavailable(message)),
            Resolution::Violation(violation) => Err(violation.into()),
        }
    }
}

/// `boundTo` value to record for a requirement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingPatch {
    pub requirement: String,
    pub bound_to: String,
}

/// Record auto-bound capabilities on the component spec, returning whether it changed
pub fn apply_binding_patches(spec: &mut ComponentSpec, patches: &[BindingPatch]) -> bool {
    let mut changed = false;
    for patch in patches {
        if let Some(required) = spec
            .capabilities
            .requires
            .iter_mut()
            .find(|r| r.name == patch.requirement)
        {
            if required.bound_to() != Some(patch.bound_to.as_str()) {
                required.bound_to = Some(patch.bound_to.clone());
                changed = true;
            }
        }
    }
    changed
}

/// Merge the `halkyon.`-prefixed requirement parameters into `target`.
///
/// Existing parameters are updated in place, missing ones appended; other
/// parameters are left alone. Returns whether `target` changed.
pub fn merge_parameters(wanted: &[NameValuePair], target: &mut Vec<NameValuePair>) -> bool {
    let mut changed = false;
    for parameter in wanted
        .iter()
        .filter(|p| p.name.starts_with(CAPABILITY_PARAMETER_PREFIX))
    {
        match target.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) if existing.value == parameter.value => {}
            Some(existing) => {
                existing.value = parameter.value.clone();
                changed = true;
            }
            None => {
                target.push(parameter.clone());
                changed = true;
            }
        }
    }
    changed
}

fn bind(
    requirement: &RequiredCapabilityConfig,
    mut capability: Capability,
    bound_to: Option<String>,
) -> Resolution {
    let parameters_changed = merge_parameters(
        &requirement.spec.parameters,
        &mut capability.spec.parameters,
    );
    Resolution::Bound(Binding {
        capability,
        parameters_changed,
        bound_to,
    })
}

/// Resolve `requirement` for a component living in `namespace`.
///
/// Both `boundTo` and auto-binding only consider the capabilities of that
/// namespace.
#[instrument(skip(store, requirement), fields(requirement = %requirement.name))]
pub async fn resolve(
    store: &dyn ObjectStore,
    requirement: &RequiredCapabilityConfig,
    namespace: &str,
) -> Result<Resolution> {
    let selector = CapabilitySelector::for_spec(&requirement.spec);

    if let Some(bound_to) = requirement.bound_to() {
        let Some(capability) = fetch::<Capability>(store, namespace, bound_to).await? else {
            return Ok(Resolution::Violation(
                ContractViolation::MissingBoundCapability {
                    bound_to: bound_to.to_string(),
                    namespace: namespace.to_string(),
                },
            ));
        };
        if !selector.matches(&capability.spec) {
            return Ok(Resolution::Violation(ContractViolation::SelectorMismatch {
                bound_to: bound_to.to_string(),
                wanted: selector.to_string(),
                found: CapabilitySelector::for_spec(&capability.spec).to_string(),
            }));
        }
        return Ok(bind(requirement, capability, None));
    }

    let mut candidates: Vec<Capability> = list::<Capability>(store, Some(namespace))
        .await?
        .into_iter()
        .filter(|c| selector.matches(&c.spec))
        .collect();
    let names: Vec<String> = candidates.iter().map(|c| c.name_any()).collect();
    debug!("Capabilities matching '{}': {:?}", selector, names);

    if requirement.auto_bindable {
        if candidates.len() > 1 {
            return Ok(Resolution::Violation(ContractViolation::AmbiguousAutoBind {
                selector: selector.to_string(),
                candidates: names,
            }));
        }
        if let Some(capability) = candidates.pop() {
            let name = capability.name_any();
            return Ok(bind(requirement, capability, Some(name)));
        }
    }

    let message = match names.as_slice() {
        [] => format!("no capability matching '{}' was found", selector),
        [single] => format!(
            "no capability bound, found one matching candidate: '{}'",
            single
        ),
        _ => format!(
            "no capability bound, several matching candidates were found: '{}'",
            names.join(", ")
        ),
    };
    Ok(Resolution::Unbound(message))
}
