// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object store the reconcilers read from and write to

use crate::constants::OPERATOR_NAME;
use crate::error::{HalkyonError, Result};
use crate::kubernetes::object::{api_resource, from_dynamic};
use async_trait::async_trait;
use kube::api::{ApiResource, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Typed access to the cluster state, as seen by the reconcilers.
///
/// Every call is a blocking round-trip from the point of view of a reconcile
/// pass. `get` reports a missing object as `None` and `delete` treats a missing
/// object as already deleted.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        params: &ListParams,
    ) -> Result<Vec<DynamicObject>>;

    async fn create(&self, resource: &ApiResource, object: &DynamicObject)
        -> Result<DynamicObject>;

    async fn update(&self, resource: &ApiResource, object: &DynamicObject)
        -> Result<DynamicObject>;

    async fn update_status(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<()>;
}

/// Fetch a typed object, `None` when it doesn't exist
pub async fn fetch<K>(store: &dyn ObjectStore, namespace: &str, name: &str) -> Result<Option<K>>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    match store.get(&api_resource::<K>(), namespace, name).await? {
        Some(object) => Ok(Some(from_dynamic(&object)?)),
        None => Ok(None),
    }
}

/// List typed objects, cluster-wide when `namespace` is `None`
pub async fn list<K>(store: &dyn ObjectStore, namespace: Option<&str>) -> Result<Vec<K>>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    store
        .list(&api_resource::<K>(), namespace, &ListParams::default())
        .await?
        .iter()
        .map(from_dynamic)
        .collect()
}

/// `ObjectStore` backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        }
    }
}

/// Map write conflicts to dedicated variants so callers can requeue on them
fn classify(err: kube::Error, kind: &str, name: &str) -> HalkyonError {
    match &err {
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
            HalkyonError::AlreadyExists {
                kind: kind.to_string(),
                name: name.to_string(),
            }
        }
        kube::Error::Api(resp) if resp.code == 409 => HalkyonError::Conflict {
            kind: kind.to_string(),
            name: name.to_string(),
            message: resp.message.clone(),
        },
        _ => HalkyonError::KubeError(err),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self, resource), fields(kind = %resource.kind))]
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self.api(resource, Some(namespace)).get_opt(name).await?)
    }

    #[instrument(skip(self, resource, params), fields(kind = %resource.kind))]
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        params: &ListParams,
    ) -> Result<Vec<DynamicObject>> {
        Ok(self.api(resource, namespace).list(params).await?.items)
    }

    #[instrument(skip(self, resource, object), fields(kind = %resource.kind, name = %object.name_any()))]
    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        self.api(resource, object.metadata.namespace.as_deref())
            .create(&Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &resource.kind, &name))
    }

    #[instrument(skip(self, resource, object), fields(kind = %resource.kind, name = %object.name_any()))]
    async fn update(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        self.api(resource, object.metadata.namespace.as_deref())
            .replace(&name, &Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &resource.kind, &name))
    }

    #[instrument(skip(self, resource, object), fields(kind = %resource.kind, name = %object.name_any()))]
    async fn update_status(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        let data = serde_json::to_vec(object)?;
        self.api(resource, object.metadata.namespace.as_deref())
            .replace_status(&name, &Self::post_params(), data)
            .await
            .map_err(|e| classify(e, &resource.kind, &name))
    }

    #[instrument(skip(self, resource), fields(kind = %resource.kind))]
    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<()> {
        match self
            .api(resource, Some(namespace))
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} {}/{} already deleted", resource.kind, namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
