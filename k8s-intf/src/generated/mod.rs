// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

// Don't complain about generated code
#[allow(clippy::all, clippy::pedantic)]
#[rustfmt::skip]
pub mod gateway_agent_crd;

pub use k8s_sample_derive::Sample;
