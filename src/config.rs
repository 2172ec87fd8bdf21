// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_REQUEUE_DELAY_SECS: u64 = 5;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;
const DEFAULT_RUNTIME_REGISTRY: &str = "quay.io/halkyonio";

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch for primary resources, all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Delay before running again a reconcile that asked to be requeued
    pub requeue_delay: Duration,
    /// Delay before retrying a reconcile that failed
    pub error_requeue_delay: Duration,
    /// Registry prefix for component runtime images
    pub runtime_registry: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            requeue_delay: Duration::from_secs(DEFAULT_REQUEUE_DELAY_SECS),
            error_requeue_delay: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
            runtime_registry: DEFAULT_RUNTIME_REGISTRY.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let watch_namespace = env::var("WATCH_NAMESPACE")
            .ok()
            .filter(|ns| !ns.trim().is_empty());

        let requeue_delay = secs_from_env("REQUEUE_DELAY_SECS", DEFAULT_REQUEUE_DELAY_SECS)?;
        let error_requeue_delay = secs_from_env("ERROR_REQUEUE_SECS", DEFAULT_ERROR_REQUEUE_SECS)?;

        let runtime_registry = env::var("RUNTIME_REGISTRY")
            .unwrap_or_else(|_| DEFAULT_RUNTIME_REGISTRY.to_string());

        Ok(Config {
            watch_namespace,
            requeue_delay,
            error_requeue_delay,
            runtime_registry,
        })
    }
}

fn secs_from_env(key: &str, default: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(value) => {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got '{}'", key, value))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
