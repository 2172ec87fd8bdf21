// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as field manager and `managed-by` label value
pub const OPERATOR_NAME: &str = "halkyon-operator";

/// Prefix of the requirement parameters that are handed over to the bound capability
pub const CAPABILITY_PARAMETER_PREFIX: &str = "halkyon.";

/// Finalizers gating explicit cleanup of resources we don't own
pub mod finalizers {
    pub const COMPONENT: &str = "halkyon.io/component-cleanup";
}

/// Recommended labels set on dependent resources
pub mod labels {
    pub const APP: &str = "app";
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    /// Component an image build runs for
    pub const BUILD: &str = "halkyon.io/build";
}

/// Message used for the status of resources seen for the first time
pub const INITIALIZING: &str = "Initializing";

/// Message used for the success status of resources
pub const READY: &str = "Ready";
