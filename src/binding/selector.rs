// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::CapabilitySpec;
use std::fmt;

/// Matches capabilities on their spec fields: category and type, plus the
/// version when one is requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySelector {
    pub category: String,
    pub type_: String,
    pub version: Option<String>,
}

impl CapabilitySelector {
    pub fn for_spec(spec: &CapabilitySpec) -> Self {
        Self {
            category: spec.category.clone(),
            type_: spec.type_.clone(),
            version: Some(spec.version.clone()).filter(|v| !v.is_empty()),
        }
    }

    pub fn matches(&self, candidate: &CapabilitySpec) -> bool {
        self.category.eq_ignore_ascii_case(&candidate.category)
            && self.type_.eq_ignore_ascii_case(&candidate.type_)
            && self
                .version
                .as_ref()
                .map_or(true, |version| *version == candidate.version)
    }
}

impl fmt::Display for CapabilitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec.category={},spec.type={}", self.category, self.type_)?;
        if let Some(version) = &self.version {
            write!(f, ",spec.version={}", version)?;
        }
        Ok(())
    }
}
