// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic reconciliation framework shared by every primary resource kind.
//!
//! A primary [`Resource`] enumerates its [`DependentResource`]s through a
//! [`BaseResource`], the [`GenericReconciler`] drives them through the
//! create-or-update protocol and folds their readiness into the primary
//! status.

pub mod base;
pub mod controller;
pub mod dependent;
pub mod reconciler;
pub mod resource;

pub use base::BaseResource;
pub use controller::ResourceController;
pub use dependent::{DependentConfig, DependentResource, DependentStatus, Readiness};
pub use reconciler::{GenericReconciler, ObjectKey, Outcome};
pub use resource::Resource;

use crate::config::Config;
use crate::kubernetes::{ClusterInfo, KubeStore, ObjectStore};
use kube::Client;
use std::sync::Arc;

/// Everything a reconcile pass needs besides the resource itself
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub cluster: ClusterInfo,
    pub config: Config,
}

impl Context {
    pub fn new(client: Client, cluster: ClusterInfo, config: Config) -> Self {
        Self {
            store: Arc::new(KubeStore::new(client)),
            cluster,
            config,
        }
    }
}
