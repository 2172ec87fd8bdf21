// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use halkyon_operator::config::Config;
use halkyon_operator::framework::{Context, ResourceController};
use halkyon_operator::kubernetes::ClusterInfo;
use halkyon_operator::reconcilers::{CapabilityResource, ComponentResource, LinkResource};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Halkyon operator");

    let config = Config::from_env()?;
    match &config.watch_namespace {
        Some(ns) => info!("Watching namespace '{}'", ns),
        None => info!("Watching all namespaces"),
    }

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let cluster = ClusterInfo::detect(&client).await?;
    let ctx = Arc::new(Context::new(client.clone(), cluster, config));

    let components = ResourceController::<ComponentResource>::new(client.clone(), ctx.clone());
    let capabilities = ResourceController::<CapabilityResource>::new(client.clone(), ctx.clone());
    let links = ResourceController::<LinkResource>::new(client, ctx);

    info!("Starting controllers...");
    tokio::try_join!(components.run(), capabilities.run(), links.run())?;

    warn!("All controllers stopped");
    Ok(())
}
