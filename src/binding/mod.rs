// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Capability binding: matching component requirements to capabilities.

pub mod resolver;
pub mod selector;

pub use resolver::{apply_binding_patches, merge_parameters, resolve, Binding, BindingPatch, Resolution};
pub use selector::CapabilitySelector;
