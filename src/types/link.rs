// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::NameValuePair;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "halkyon.io", version = "v1beta1", kind = "Link")]
#[kube(namespaced)]
#[kube(status = "LinkStatus")]
#[kube(shortname = "hl")]
#[kube(printcolumn = r#"{"name":"Component","type":"string","jsonPath":".spec.componentName"}"#)]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[serde(rename_all = "camelCase")]
pub struct LinkSpec {
    pub component_name: String,
    #[serde(rename = "type", default)]
    pub link_type: LinkType,
    /// Name of the secret injected by a `Secret` link
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<NameValuePair>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum LinkType {
    #[default]
    Secret,
    Env,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum LinkPhase {
    Pending,
    Ready,
    Failed,
    Unknown,
}

impl LinkPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPhase::Pending => "Pending",
            LinkPhase::Ready => "Ready",
            LinkPhase::Failed => "Failed",
            LinkPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<LinkPhase>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}
