// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::NameValuePair;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "halkyon.io", version = "v1beta1", kind = "Capability")]
#[kube(namespaced)]
#[kube(status = "CapabilityStatus")]
#[kube(shortname = "hcap")]
#[kube(printcolumn = r#"{"name":"Category","type":"string","jsonPath":".spec.category"}"#)]
#[kube(printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#)]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySpec {
    pub category: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<NameValuePair>,
}

impl CapabilitySpec {
    pub fn new(category: &str, type_: &str, version: &str) -> Self {
        Self {
            category: category.to_string(),
            type_: type_.to_string(),
            version: version.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Parameters as a map, later values winning over earlier ones
    pub fn parameters_as_map(&self) -> BTreeMap<&str, &str> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum CapabilityPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl CapabilityPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityPhase::Pending => "Pending",
            CapabilityPhase::Running => "Running",
            CapabilityPhase::Succeeded => "Succeeded",
            CapabilityPhase::Failed => "Failed",
            CapabilityPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CapabilityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<CapabilityPhase>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
}

impl Capability {
    pub fn phase(&self) -> Option<CapabilityPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    /// A capability is usable by components once its backing service runs
    pub fn is_ready(&self) -> bool {
        self.phase() == Some(CapabilityPhase::Running)
    }

    pub fn status_message(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.message.as_str())
            .unwrap_or_default()
    }
}
