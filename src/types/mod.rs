// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources reconciled by the operator.

pub mod capability;
pub mod component;
pub mod link;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use capability::{Capability, CapabilityPhase, CapabilitySpec, CapabilityStatus};
pub use component::{
    BuildConfig, Component, ComponentPhase, ComponentSpec, ComponentStatus, DeploymentMode,
    RequiredCapabilityConfig,
};
pub use link::{Link, LinkPhase, LinkSpec, LinkStatus, LinkType};

/// A named value, used for parameters and environment variables
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct NameValuePair {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
