// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Conversions between typed Kubernetes objects and `DynamicObject`

use crate::error::{HalkyonError, Result};
use kube::api::{ApiResource, DynamicObject};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// The API resource describing a statically typed kind
pub fn api_resource<K>() -> ApiResource
where
    K: Resource<DynamicType = ()>,
{
    ApiResource::erase::<K>(&())
}

/// Convert a typed object into a `DynamicObject`, keeping its type meta
pub fn to_dynamic<K>(object: &K) -> Result<DynamicObject>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(object)?;
    if let Some(fields) = value.as_object_mut() {
        fields
            .entry("apiVersion")
            .or_insert_with(|| Value::String(K::api_version(&()).into_owned()));
        fields
            .entry("kind")
            .or_insert_with(|| Value::String(K::kind(&()).into_owned()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Convert a `DynamicObject` back into its typed representation
pub fn from_dynamic<K>(object: &DynamicObject) -> Result<K>
where
    K: DeserializeOwned,
{
    let value = serde_json::to_value(object)?;
    Ok(serde_json::from_value(value)?)
}

/// Apply `change` to the typed view of `object`, writing it back when it
/// reports a change. Returns whether it did.
pub fn modify_as<K, F>(object: &mut DynamicObject, change: F) -> Result<bool>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    F: FnOnce(&mut K) -> bool,
{
    let mut typed: K = from_dynamic(object)?;
    if !change(&mut typed) {
        return Ok(false);
    }
    *object = to_dynamic(&typed)?;
    Ok(true)
}

/// The `status` section of an object, `Value::Null` when absent
pub fn status_of<K: Serialize>(object: &K) -> Result<Value> {
    let mut value = serde_json::to_value(object)?;
    Ok(value
        .get_mut("status")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

/// Make `owner` the controller of `object` so it gets garbage collected with it
pub fn set_controller_reference<O>(object: &mut DynamicObject, owner: &O) -> Result<()>
where
    O: Resource<DynamicType = ()>,
{
    let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        HalkyonError::Validation(format!(
            "cannot set '{}' {} as owner of '{}': owner has no uid",
            owner.name_any(),
            O::kind(&()),
            object.name_any()
        ))
    })?;

    let refs = object.metadata.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.controller != Some(true));
    refs.push(owner_ref);
    Ok(())
}

pub fn has_finalizer<K: Resource>(object: &K, finalizer: &str) -> bool {
    object
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|name| name == finalizer))
}

/// Add `finalizer` to the object, returning whether it was missing
pub fn add_finalizer<K: Resource>(object: &mut K, finalizer: &str) -> bool {
    if has_finalizer(object, finalizer) {
        return false;
    }
    object
        .meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Remove `finalizer` from the object, returning whether it was present
pub fn remove_finalizer<K: Resource>(object: &mut K, finalizer: &str) -> bool {
    if !has_finalizer(object, finalizer) {
        return false;
    }
    if let Some(finalizers) = object.meta_mut().finalizers.as_mut() {
        finalizers.retain(|name| name != finalizer);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Component, ComponentSpec};
    use k8s_openapi::api::core::v1::Service;
    use kube::api::ObjectMeta;

    fn make_component() -> Component {
        let mut component = Component::new("backend", ComponentSpec::default());
        component.metadata.namespace = Some("demo".to_string());
        component.metadata.uid = Some("uid-1".to_string());
        component
    }

    fn make_service() -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("backend".to_string()),
                namespace: Some("demo".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_to_dynamic_keeps_type_meta() {
        let dynamic = to_dynamic(&make_service()).unwrap();
        let types = dynamic.types.unwrap();
        assert_eq!(types.api_version, "v1");
        assert_eq!(types.kind, "Service");
        assert_eq!(dynamic.metadata.name.as_deref(), Some("backend"));
    }

    #[test]
    fn test_from_dynamic_restores_typed_object() {
        let dynamic = to_dynamic(&make_component()).unwrap();
        let component: Component = from_dynamic(&dynamic).unwrap();
        assert_eq!(component.name_any(), "backend");
        assert_eq!(component.metadata.uid.as_deref(), Some("uid-1"));
    }

    #[test]
    fn test_api_resource_for_custom_resource() {
        let ar = api_resource::<Component>();
        assert_eq!(ar.group, "halkyon.io");
        assert_eq!(ar.kind, "Component");
        assert_eq!(ar.plural, "components");
    }

    #[test]
    fn test_set_controller_reference() {
        let mut service = to_dynamic(&make_service()).unwrap();
        set_controller_reference(&mut service, &make_component()).unwrap();

        let refs = service.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "Component");
        assert_eq!(refs[0].uid, "uid-1");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_set_controller_reference_requires_uid() {
        let mut service = to_dynamic(&make_service()).unwrap();
        let mut owner = make_component();
        owner.metadata.uid = None;
        assert!(set_controller_reference(&mut service, &owner).is_err());
    }

    #[test]
    fn test_finalizers() {
        let mut component = make_component();
        assert!(!has_finalizer(&component, "halkyon.io/test"));
        assert!(add_finalizer(&mut component, "halkyon.io/test"));
        assert!(!add_finalizer(&mut component, "halkyon.io/test"));
        assert!(has_finalizer(&component, "halkyon.io/test"));
        assert!(remove_finalizer(&mut component, "halkyon.io/test"));
        assert!(!has_finalizer(&component, "halkyon.io/test"));
    }

    #[test]
    fn test_modify_as_writes_back_changes_only() {
        let mut dynamic = to_dynamic(&make_service()).unwrap();

        let changed = modify_as::<Service, _>(&mut dynamic, |_| false).unwrap();
        assert!(!changed);

        let changed = modify_as::<Service, _>(&mut dynamic, |svc| {
            svc.labels_mut().insert("app".to_string(), "backend".to_string());
            true
        })
        .unwrap();
        assert!(changed);
        assert_eq!(dynamic.labels().get("app").map(String::as_str), Some("backend"));
    }

    #[test]
    fn test_status_of_missing_status() {
        assert_eq!(status_of(&make_component()).unwrap(), Value::Null);
    }
}
