// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::resource::persist;
use super::{Context, Resource};
use crate::constants::INITIALIZING;
use crate::error::{HalkyonError, Result};
use crate::kubernetes::object::{
    add_finalizer, api_resource, has_finalizer, remove_finalizer, status_of, to_dynamic,
};
use crate::kubernetes::store::fetch;
use kube::Resource as _;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Namespaced name of the primary resource to reconcile
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub name: String,
    pub namespace: String,
}

impl ObjectKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub requeue: bool,
}

impl Outcome {
    pub fn requeue() -> Self {
        Self { requeue: true }
    }

    pub fn done() -> Self {
        Self { requeue: false }
    }
}

/// The control loop shared by every primary resource kind
pub struct GenericReconciler<R: Resource> {
    ctx: Arc<Context>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> GenericReconciler<R> {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            _resource: PhantomData,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    fn type_name() -> String {
        R::Object::kind(&()).into_owned()
    }

    /// Bring the resource identified by `key` one step closer to its desired state.
    ///
    /// Transient failures requeue without touching the phase; any other
    /// failure of the kind's create-or-update is recorded as a Failed status
    /// and returned.
    #[instrument(skip(self, key), fields(kind = %Self::type_name(), key = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Outcome> {
        let ctx = self.context();
        let type_name = Self::type_name();

        let Some(object) = fetch::<R::Object>(ctx.store.as_ref(), &key.namespace, &key.name).await?
        else {
            debug!("{} '{}' is gone, nothing to do", type_name, key);
            return Ok(Outcome::done());
        };
        let mut resource = R::from_object(object);

        if resource.should_delete() {
            return self.finalize(resource).await;
        }

        if let Some(finalizer) = resource.finalizer(ctx) {
            if add_finalizer(resource.object_mut(), finalizer) {
                persist(&mut resource, ctx).await?;
            }
        }

        let initial_status = status_of(resource.object())?;
        let initial_phase = resource.status_as_string();
        if resource.object().meta().generation == Some(1) && initial_status.is_null() {
            resource.set_initial_status(INITIALIZING);
        }

        if resource.init() {
            debug!("Persisting defaults of {} '{}'", type_name, key);
            if let Err(e) = persist(&mut resource, ctx).await {
                return Self::requeue_on_transient(e);
            }
            return Ok(Outcome::requeue());
        }

        if !resource.is_valid() {
            return Ok(Outcome::requeue());
        }

        if let Err(e) = resource.check_validity() {
            warn!("{} '{}' is invalid: {}", type_name, key, e);
            resource.set_error_status(&e);
            self.update_status_if_needed(&mut resource, &initial_status).await?;
            return Ok(Outcome::requeue());
        }

        debug!("-> {} '{}' ({})", type_name, key, initial_phase);

        let dependents = resource.dependents(ctx);
        match resource.create_or_update(&dependents, ctx).await {
            Ok(()) => {
                dependents.compute_status(&mut resource, ctx).await;
            }
            Err(e) if e.is_transient() => {
                warn!("Transient failure reconciling {} '{}', requeueing: {}", type_name, key, e);
                dependents.compute_status(&mut resource, ctx).await;
                resource.set_needs_requeue(true);
            }
            Err(e) => {
                error!("Failed to create or update {} '{}': {}", type_name, key, e);
                resource.set_error_status(&e);
                if let Err(status_err) = self.update_status_if_needed(&mut resource, &initial_status).await {
                    warn!("Failed to record error status of '{}': {}", key, status_err);
                }
                return Err(e);
            }
        }

        self.update_status_if_needed(&mut resource, &initial_status).await?;

        let requeue = resource.needs_requeue();
        let new_phase = resource.status_as_string();
        if new_phase != initial_phase {
            let suffix = if requeue { " (requeued)" } else { "" };
            info!("<- {} '{}' ({}){}", type_name, key, new_phase, suffix);
        }
        Ok(Outcome { requeue })
    }

    /// Run the resource cleanup once, then release its finalizer
    async fn finalize(&self, mut resource: R) -> Result<Outcome> {
        let ctx = self.context();
        let Some(finalizer) = resource
            .finalizer(ctx)
            .filter(|f| has_finalizer(resource.object(), f))
        else {
            debug!("{} '{}' is being deleted", Self::type_name(), resource.name());
            return Ok(Outcome::done());
        };

        info!(
            "{} '{}' is marked for deletion, running clean-up",
            Self::type_name(),
            resource.name()
        );
        resource.delete(ctx).await?;
        remove_finalizer(resource.object_mut(), finalizer);
        persist(&mut resource, ctx).await?;
        Ok(Outcome {
            requeue: resource.needs_requeue(),
        })
    }

    /// Persist the status subresource when it differs from what was fetched.
    ///
    /// A conflict means someone else wrote the resource in the meantime: the
    /// next pass recomputes the status from fresh state.
    async fn update_status_if_needed(&self, resource: &mut R, initial: &Value) -> Result<()> {
        if status_of(resource.object())? == *initial {
            return Ok(());
        }
        let ctx = self.context();
        let object = to_dynamic(resource.object())?;
        match ctx
            .store
            .update_status(&api_resource::<R::Object>(), &object)
            .await
        {
            Ok(updated) => {
                resource.object_mut().meta_mut().resource_version =
                    updated.metadata.resource_version;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                debug!("Status of '{}' changed underneath us: {}", resource.name(), e);
                resource.set_needs_requeue(true);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn requeue_on_transient(err: HalkyonError) -> Result<Outcome> {
        if err.is_transient() {
            Ok(Outcome::requeue())
        } else {
            Err(err)
        }
    }
}
