// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster flavor detection

use crate::error::{HalkyonError, Result};
use kube::Client;
use tracing::info;

const OPENSHIFT_GROUP_SUFFIX: &str = ".openshift.io";
const OPENSHIFT_4_GROUP: &str = "config.openshift.io";

/// Flavor of the cluster the operator runs against, detected once at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    openshift_version: Option<u8>,
}

impl ClusterInfo {
    /// A plain Kubernetes cluster
    pub fn kubernetes() -> Self {
        Self::default()
    }

    pub fn openshift(major_version: u8) -> Self {
        Self {
            openshift_version: Some(major_version),
        }
    }

    /// Derive the cluster flavor from the names of the served API groups
    pub fn from_api_groups<'a>(groups: impl IntoIterator<Item = &'a str>) -> Self {
        let mut version = None;
        for group in groups {
            if group == OPENSHIFT_4_GROUP {
                return Self::openshift(4);
            }
            if group.ends_with(OPENSHIFT_GROUP_SUFFIX) {
                version = Some(3);
            }
        }
        Self {
            openshift_version: version,
        }
    }

    /// Query the API server for its groups and derive the cluster flavor
    pub async fn detect(client: &Client) -> Result<Self> {
        let groups = client
            .list_api_groups()
            .await
            .map_err(|e| HalkyonError::Discovery(e.to_string()))?;

        let info = Self::from_api_groups(groups.groups.iter().map(|g| g.name.as_str()));
        match info.openshift_version {
            Some(version) => info!("Detected OpenShift {} cluster", version),
            None => info!("Detected Kubernetes cluster"),
        }
        Ok(info)
    }

    pub fn is_openshift(&self) -> bool {
        self.openshift_version.is_some()
    }

    pub fn openshift_version(&self) -> Option<u8> {
        self.openshift_version
    }
}
