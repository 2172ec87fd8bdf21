// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HalkyonError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("conflict while writing {kind} '{name}': {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("{0}")]
    Contract(ContractViolation),

    #[error("{0}")]
    CapabilityUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("API discovery failed: {0}")]
    Discovery(String),
}

impl HalkyonError {
    /// Errors that go away on their own once another reconcile pass runs.
    pub fn is_transient(&self) -> bool {
        match self {
            HalkyonError::Conflict { .. } | HalkyonError::AlreadyExists { .. } => true,
            HalkyonError::KubeError(kube::Error::Api(err)) => err.code == 409,
            _ => false,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, HalkyonError::AlreadyExists { .. })
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, HalkyonError::Contract(_))
    }
}

impl From<ContractViolation> for HalkyonError {
    fn from(violation: ContractViolation) -> Self {
        HalkyonError::Contract(violation)
    }
}

/// A capability binding that cannot be satisfied until a user changes a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// `boundTo` names a capability that doesn't exist.
    MissingBoundCapability { bound_to: String, namespace: String },
    /// `boundTo` names a capability that doesn't satisfy the requirement selector.
    SelectorMismatch {
        bound_to: String,
        wanted: String,
        found: String,
    },
    /// Several capabilities match an auto-bindable requirement.
    AmbiguousAutoBind {
        selector: String,
        candidates: Vec<String>,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::MissingBoundCapability {
                bound_to,
                namespace,
            } => write!(
                f,
                "bound capability '{}' doesn't exist in namespace '{}'",
                bound_to, namespace
            ),
            ContractViolation::SelectorMismatch {
                bound_to,
                wanted,
                found,
            } => write!(
                f,
                "specified '{}' bound to capability doesn't match '{}' requirements, was: '{}'",
                bound_to, wanted, found
            ),
            ContractViolation::AmbiguousAutoBind {
                selector,
                candidates,
            } => write!(
                f,
                "cannot autobind because several capabilities match '{}': '{}', use explicit binding instead",
                selector,
                candidates.join(", ")
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, HalkyonError>;
