// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prints the Halkyon custom resource definitions, ready for `kubectl apply -f -`.

use halkyon_operator::types::{Capability, Component, Link};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Component::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Capability::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Link::crd())?);
    Ok(())
}
