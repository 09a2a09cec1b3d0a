// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Dataplane gRPC handling module.
//! Implements gRPC request reception and response building.

use config::*;
use serde_yml;

mod config;

#[allow(dead_code)]
fn load_yaml_gwc() -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    const YAML_FILE: &str = "src/grpc/gwc.yml";

    let yaml_from_file = std::fs::read_to_string(YAML_FILE)?;
    let gwc = serde_yml::from_str(&yaml_from_file)?;
    Ok(gwc)
}
