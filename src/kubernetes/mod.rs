// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: object store, typed/dynamic conversions and cluster detection.

pub mod cluster;
pub mod object;
pub mod store;

pub use cluster::ClusterInfo;
pub use store::{KubeStore, ObjectStore};
