// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an in-memory object store and a mock Kubernetes API service.

use crate::config::Config;
use crate::error::{HalkyonError, Result};
use crate::framework::{
    BaseResource, Context, DependentConfig, DependentResource, DependentStatus, Readiness, Resource as PrimaryResource,
};
use crate::kubernetes::object::{api_resource, from_dynamic, to_dynamic};
use crate::kubernetes::{ClusterInfo, ObjectStore};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{ApiResource, DynamicObject, ListParams, ObjectMeta};
use kube::client::Body;
use kube::core::ErrorResponse;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use tower::Service;

/// Kind, namespace and name of a stored object
type StoreKey = (String, String, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// A write issued against the `FakeStore`, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub op: WriteOp,
    pub kind: String,
    pub name: String,
}

/// In-memory `ObjectStore` mimicking the API server semantics the reconcilers
/// rely on: resource versions, status subresource, label selectors and
/// finalizer-gated deletion.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<BTreeMap<StoreKey, DynamicObject>>,
    writes: Mutex<Vec<WriteRecord>>,
    failures: Mutex<Vec<(WriteOp, String, String)>>,
    version: AtomicU64,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K>(self, object: K) -> Self
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        self.insert(&object);
        self
    }

    /// Store an object as-is, without recording a write
    pub fn insert<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let mut dynamic = to_dynamic(object).unwrap();
        if dynamic.metadata.resource_version.is_none() {
            dynamic.metadata.resource_version = Some(self.next_version());
        }
        if dynamic.metadata.uid.is_none() {
            dynamic.metadata.uid = Some(format!("uid-{}", dynamic.name_any()));
        }
        let key = Self::key(&K::kind(&()), &dynamic);
        self.objects.lock().unwrap().insert(key, dynamic);
    }

    pub fn get_as<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let key = (
            K::kind(&()).into_owned(),
            namespace.to_string(),
            name.to_string(),
        );
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|object| from_dynamic(object).unwrap())
    }

    pub fn contains<K>(&self, namespace: &str, name: &str) -> bool
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.get_as::<K>(namespace, name).is_some()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().unwrap().clone()
    }

    /// Kinds of the created objects, in creation order
    pub fn created_kinds(&self) -> Vec<String> {
        self.writes()
            .into_iter()
            .filter(|w| w.op == WriteOp::Create)
            .map(|w| w.kind)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Make the next `op` on the named object fail: creates with
    /// `AlreadyExists`, other writes with `Conflict`.
    pub fn fail_next(&self, op: WriteOp, kind: &str, name: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((op, kind.to_string(), name.to_string()));
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn key(kind: &str, object: &DynamicObject) -> StoreKey {
        (
            kind.to_string(),
            object.metadata.namespace.clone().unwrap_or_default(),
            object.name_any(),
        )
    }

    fn record(&self, op: WriteOp, kind: &str, name: &str) {
        self.writes.lock().unwrap().push(WriteRecord {
            op,
            kind: kind.to_string(),
            name: name.to_string(),
        });
    }

    fn take_failure(&self, op: WriteOp, kind: &str, name: &str) -> Option<HalkyonError> {
        let mut failures = self.failures.lock().unwrap();
        let index = failures
            .iter()
            .position(|(o, k, n)| *o == op && k == kind && n == name)?;
        failures.remove(index);
        Some(match op {
            WriteOp::Create => HalkyonError::AlreadyExists {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            _ => HalkyonError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: "injected conflict".to_string(),
            },
        })
    }

    fn check_version(stored: &DynamicObject, incoming: &DynamicObject, kind: &str) -> Result<()> {
        match &incoming.metadata.resource_version {
            Some(version) if Some(version) != stored.metadata.resource_version.as_ref() => {
                Err(HalkyonError::Conflict {
                    kind: kind.to_string(),
                    name: incoming.name_any(),
                    message: "the object has been modified".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn not_found(kind: &str, name: &str) -> HalkyonError {
    HalkyonError::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} \"{}\" not found", kind, name),
        reason: "NotFound".to_string(),
        code: 404,
    }))
}

fn matches_labels(object: &DynamicObject, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = object.labels();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
            None => labels.contains_key(term.trim()),
        })
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        let key = (
            resource.kind.clone(),
            namespace.to_string(),
            name.to_string(),
        );
        Ok(self.objects.lock().unwrap().get(&key).cloned())
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        params: &ListParams,
    ) -> Result<Vec<DynamicObject>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((kind, ns, _), _)| {
                *kind == resource.kind && namespace.map_or(true, |wanted| wanted == ns)
            })
            .filter(|(_, object)| matches_labels(object, params.label_selector.as_deref()))
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        self.record(WriteOp::Create, &resource.kind, &name);
        if let Some(err) = self.take_failure(WriteOp::Create, &resource.kind, &name) {
            return Err(err);
        }

        let key = Self::key(&resource.kind, object);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(HalkyonError::AlreadyExists {
                kind: resource.kind.clone(),
                name,
            });
        }
        let mut created = object.clone();
        created.metadata.resource_version = Some(self.next_version());
        created.metadata.uid = Some(format!("uid-{}", name));
        objects.insert(key, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        self.record(WriteOp::Update, &resource.kind, &name);
        if let Some(err) = self.take_failure(WriteOp::Update, &resource.kind, &name) {
            return Err(err);
        }

        let key = Self::key(&resource.kind, object);
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get(&key)
            .ok_or_else(|| not_found(&resource.kind, &name))?;
        Self::check_version(stored, object, &resource.kind)?;

        let mut updated = object.clone();
        match stored.data.get("status") {
            Some(status) => updated.data["status"] = status.clone(),
            None => {
                if let Some(fields) = updated.data.as_object_mut() {
                    fields.remove("status");
                }
            }
        }
        updated.metadata.resource_version = Some(self.next_version());

        let released = updated.metadata.deletion_timestamp.is_some()
            && updated.finalizers().is_empty();
        if released {
            objects.remove(&key);
        } else {
            objects.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn update_status(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object.name_any();
        self.record(WriteOp::UpdateStatus, &resource.kind, &name);
        if let Some(err) = self.take_failure(WriteOp::UpdateStatus, &resource.kind, &name) {
            return Err(err);
        }

        let key = Self::key(&resource.kind, object);
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get(&key)
            .ok_or_else(|| not_found(&resource.kind, &name))?;
        Self::check_version(stored, object, &resource.kind)?;

        let mut updated = stored.clone();
        match object.data.get("status") {
            Some(status) => updated.data["status"] = status.clone(),
            None => {
                if let Some(fields) = updated.data.as_object_mut() {
                    fields.remove("status");
                }
            }
        }
        updated.metadata.resource_version = Some(self.next_version());
        objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<()> {
        self.record(WriteOp::Delete, &resource.kind, name);
        let key = (
            resource.kind.clone(),
            namespace.to_string(),
            name.to_string(),
        );
        self.objects.lock().unwrap().remove(&key);
        Ok(())
    }
}

/// A reconcile context over `store` for a plain Kubernetes cluster
pub fn context(store: Arc<FakeStore>) -> Context {
    context_for(store, ClusterInfo::kubernetes())
}

pub fn context_for(store: Arc<FakeStore>, cluster: ClusterInfo) -> Context {
    Context {
        store,
        cluster,
        config: Config::default(),
    }
}

/// The API resource of a typed kind, shorthand for assertions
pub fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    api_resource::<K>().kind
}

/// A primary resource backed by a ConfigMap, keeping its status in memory
pub struct TestOwner {
    object: ConfigMap,
    requeue: bool,
    phase: String,
    message: String,
}

impl TestOwner {
    pub fn message(&self) -> &str {
        &self.message
    }

    fn set_status(&mut self, phase: &str, message: &str) -> bool {
        if self.should_delete() || (self.phase == phase && self.message == message) {
            return false;
        }
        self.phase = phase.to_string();
        self.message = message.to_string();
        true
    }
}

impl PrimaryResource for TestOwner {
    type Object = ConfigMap;

    fn from_object(object: ConfigMap) -> Self {
        Self {
            object,
            requeue: false,
            phase: String::new(),
            message: String::new(),
        }
    }

    fn object(&self) -> &ConfigMap {
        &self.object
    }

    fn object_mut(&mut self) -> &mut ConfigMap {
        &mut self.object
    }

    fn status_as_string(&self) -> String {
        self.phase.clone()
    }

    fn needs_requeue(&self) -> bool {
        self.requeue
    }

    fn set_needs_requeue(&mut self, requeue: bool) {
        self.requeue = requeue;
    }

    fn set_initial_status(&mut self, message: &str) -> bool {
        self.set_status("Pending", message)
    }

    fn set_error_status(&mut self, err: &HalkyonError) -> bool {
        self.set_status("Failed", &err.to_string())
    }

    fn set_success_status(&mut self, _statuses: &[DependentStatus], message: &str) -> bool {
        self.requeue = false;
        self.set_status("Ready", message)
    }

    fn dependents(&self, _ctx: &Context) -> BaseResource<Self> {
        BaseResource::new()
    }

    fn watched_secondary_resource_types(_cluster: &ClusterInfo) -> Vec<ApiResource> {
        Vec::new()
    }
}

/// A `TestOwner` named `name` in namespace `demo`
pub fn test_owner(name: &str) -> TestOwner {
    TestOwner::from_object(ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("demo".to_string()),
            uid: Some(format!("uid-{}", name)),
            ..Default::default()
        },
        ..Default::default()
    })
}

/// A dependent of kind `K` with a fixed name and configurable behavior
pub struct StubDependent<K> {
    name: String,
    config: DependentConfig,
    labels: BTreeMap<String, String>,
    not_ready: Option<String>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> StubDependent<K>
where
    K: Resource<DynamicType = ()> + Default,
{
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: DependentConfig::default(),
            labels: BTreeMap::new(),
            not_ready: None,
            _kind: PhantomData,
        }
    }

    pub fn with_config(mut self, config: DependentConfig) -> Self {
        self.config = config;
        self
    }

    /// Label the built object, and add it to live objects missing it
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn not_ready(mut self, message: &str) -> Self {
        self.not_ready = Some(message.to_string());
        self
    }

    /// A bare object of kind `K` named `name` in namespace `demo`
    pub fn object(name: &str) -> K {
        let mut object = K::default();
        object.meta_mut().name = Some(name.to_string());
        object.meta_mut().namespace = Some("demo".to_string());
        object
    }
}

#[async_trait]
impl<K, P> DependentResource<P> for StubDependent<K>
where
    K: Resource<DynamicType = ()> + Default + Serialize,
    P: PrimaryResource,
{
    fn api_resource(&self) -> ApiResource {
        api_resource::<K>()
    }

    fn config(&self) -> DependentConfig {
        self.config
    }

    fn name(&self, _owner: &P) -> String {
        self.name.clone()
    }

    fn build(&self, owner: &P, _ctx: &Context) -> Result<DynamicObject> {
        let mut object = Self::object(&self.name);
        object.meta_mut().namespace = Some(owner.namespace());
        if !self.labels.is_empty() {
            object.meta_mut().labels = Some(self.labels.clone());
        }
        to_dynamic(&object)
    }

    fn update(&self, _owner: &P, live: &mut DynamicObject) -> Result<bool> {
        let labels = live.labels_mut();
        let mut changed = false;
        for (key, value) in &self.labels {
            if labels.get(key) != Some(value) {
                labels.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        Ok(changed)
    }

    fn is_ready(&self, _owner: &P, _live: &DynamicObject) -> Readiness {
        match &self.not_ready {
            Some(message) => Readiness::not_ready(message.clone()),
            None => Readiness::ready(),
        }
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Add a response for DELETE requests matching the exact path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a failure `Status` response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create an `APIGroupList` response naming the given groups
pub fn api_groups_json(groups: &[&str]) -> String {
    let groups: Vec<_> = groups
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "versions": [{"groupVersion": format!("{}/v1", name), "version": "v1"}],
                "preferredVersion": {"groupVersion": format!("{}/v1", name), "version": "v1"}
            })
        })
        .collect();
    serde_json::json!({
        "kind": "APIGroupList",
        "apiVersion": "v1",
        "groups": groups
    })
    .to_string()
}
