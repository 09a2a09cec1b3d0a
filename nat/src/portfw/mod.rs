// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port forwarding

mod flow_state;
mod nf;
mod packet;
mod portfwtable;

pub use flow_state::PortFwState;
pub use nf::PortForwarder;
pub use portfwtable::{PortFwEntry, PortFwKey, PortFwTable, PortFwTableRw};
