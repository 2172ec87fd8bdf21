// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Wiring of a [`GenericReconciler`] into a kube-runtime controller

use super::{Context, GenericReconciler, ObjectKey, Resource};
use crate::error::{HalkyonError, Result};
use futures::StreamExt;
use kube::{
    api::DynamicObject,
    core::NamespaceResourceScope,
    runtime::{controller::Action, Controller},
    Api, Client, Resource as _, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the reconcile loop of one primary resource kind
pub struct ResourceController<R: Resource> {
    client: Client,
    reconciler: GenericReconciler<R>,
}

impl<R: Resource> ResourceController<R> {
    pub fn new(client: Client, ctx: Arc<Context>) -> Self {
        Self {
            client,
            reconciler: GenericReconciler::new(ctx),
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match &self.reconciler.context().config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let ctx = self.reconciler.context();
        let kind = R::Object::kind(&()).into_owned();
        let primary: Api<R::Object> = self.api();

        let mut controller = Controller::new(primary, WatcherConfig::default());
        for resource in R::watched_secondary_resource_types(&ctx.cluster) {
            debug!("{} controller watches owned {}", kind, resource.kind);
            let api: Api<DynamicObject> = match &ctx.config.watch_namespace {
                Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
                None => Api::all_with(self.client.clone(), &resource),
            };
            controller = controller.owns_with(api, resource, WatcherConfig::default());
        }

        info!("Starting {} controller", kind);
        let reconciler = Arc::new(self.reconciler);
        controller
            .shutdown_on_signal()
            .run(reconcile::<R>, error_policy::<R>, reconciler)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("{} controller stopped", kind);
        Ok(())
    }
}

async fn reconcile<R: Resource>(
    object: Arc<R::Object>,
    reconciler: Arc<GenericReconciler<R>>,
) -> Result<Action> {
    let key = ObjectKey::new(&object.namespace().unwrap_or_default(), &object.name_any());
    let outcome = reconciler.reconcile(&key).await?;

    let config = &reconciler.context().config;
    if outcome.requeue {
        Ok(Action::requeue(config.requeue_delay))
    } else {
        Ok(Action::await_change())
    }
}

fn error_policy<R: Resource>(
    object: Arc<R::Object>,
    error: &HalkyonError,
    reconciler: Arc<GenericReconciler<R>>,
) -> Action {
    error!("Reconciliation error for '{}': {}", object.name_any(), error);
    Action::requeue(reconciler.context().config.error_requeue_delay)
}
