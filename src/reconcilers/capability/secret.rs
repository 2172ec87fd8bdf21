// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{params, CapabilityResource};
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Resource};
use crate::kubernetes::object::{api_resource, to_dynamic};
use crate::reconcilers::dependent_meta;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{ApiResource, DynamicObject};
use std::collections::BTreeMap;

/// Database connection settings shared by the database and its consumers
pub struct ConfigSecret;

/// Name of the configuration secret of a capability
pub fn secret_name(owner: &CapabilityResource) -> String {
    owner
        .parameter(params::DB_CONFIG_NAME)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-config", owner.name().to_lowercase()))
}

#[async_trait]
impl DependentResource<CapabilityResource> for ConfigSecret {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Secret>()
    }

    fn config(&self) -> DependentConfig {
        DependentConfig {
            watched: false,
            ..Default::default()
        }
    }

    fn name(&self, owner: &CapabilityResource) -> String {
        secret_name(owner)
    }

    fn build(&self, owner: &CapabilityResource, _ctx: &Context) -> Result<DynamicObject> {
        let user = owner.parameter(params::DB_USER).unwrap_or_default();
        let password = owner.parameter(params::DB_PASSWORD).unwrap_or_default();
        let database = owner.database_name();
        let owner_name = owner.name();
        let host = owner.parameter(params::DB_HOST).unwrap_or(owner_name.as_str());
        let port = owner.parameter(params::DB_PORT).unwrap_or(params::DEFAULT_PORT);

        let data: BTreeMap<String, ByteString> = [
            (params::POSTGRES_USER, user),
            (params::POSTGRES_PASSWORD, password),
            (params::POSTGRES_DB, database),
            (params::DB_HOST, host),
            (params::DB_PORT, port),
            (params::DB_NAME, database),
            (params::DB_USER, user),
            (params::DB_PASSWORD, password),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), ByteString(value.as_bytes().to_vec())))
        .collect();

        to_dynamic(&Secret {
            metadata: dependent_meta(owner, &self.name(owner)),
            data: Some(data),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::object::from_dynamic;
    use crate::test_utils::{context, FakeStore};
    use crate::types::{Capability, CapabilitySpec, NameValuePair};
    use std::sync::Arc;

    fn make_resource(parameters: Vec<NameValuePair>) -> CapabilityResource {
        let mut spec = CapabilitySpec::new("database", "postgres", "");
        spec.parameters = parameters;
        let mut capability = Capability::new("Orders", spec);
        capability.metadata.namespace = Some("demo".to_string());
        CapabilityResource::from_object(capability)
    }

    fn value(secret: &Secret, key: &str) -> String {
        let bytes = &secret.data.as_ref().unwrap()[key].0;
        String::from_utf8(bytes.clone()).unwrap()
    }

    #[test]
    fn test_default_name_and_values() {
        let resource = make_resource(vec![NameValuePair::new("DB_USER", "admin")]);
        let ctx = context(Arc::new(FakeStore::new()));

        let built = ConfigSecret.build(&resource, &ctx).unwrap();
        let secret: Secret = from_dynamic(&built).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("orders-config"));
        assert_eq!(value(&secret, "DB_USER"), "admin");
        assert_eq!(value(&secret, "POSTGRES_USER"), "admin");
        assert_eq!(value(&secret, "DB_NAME"), "sample-db");
        assert_eq!(value(&secret, "DB_HOST"), "Orders");
        assert_eq!(value(&secret, "DB_PORT"), "5432");
    }

    #[test]
    fn test_name_from_parameter() {
        let resource = make_resource(vec![NameValuePair::new("DB_CONFIG_NAME", "pg-creds")]);
        assert_eq!(ConfigSecret.name(&resource), "pg-creds");
    }
}
