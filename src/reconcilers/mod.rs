// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Primary resource kinds and the dependents they maintain.

pub mod capability;
pub mod component;
pub mod link;
pub mod rbac;

pub use capability::CapabilityResource;
pub use component::ComponentResource;
pub use link::LinkResource;

use crate::constants::{labels, OPERATOR_NAME};
use crate::framework::Resource;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Labels identifying the objects created for the application `app`
pub fn labels_for(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::APP.to_string(), app.to_string()),
        (labels::NAME.to_string(), app.to_string()),
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

/// Metadata of a dependent named `name`, living next to its owner
pub fn dependent_meta<P: Resource>(owner: &P, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(owner.namespace()),
        labels: Some(labels_for(&owner.name())),
        ..Default::default()
    }
}
