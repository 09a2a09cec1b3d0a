// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet capture and injection engine for the dataplane test harness.
//!
//! [`Engine`] runs a background capture loop over a set of registered ports,
//! each backed by a pluggable [`PortBackend`]: a raw-socket backend for Linux
//! kernel interfaces, a virtual-transport backend that multiplexes many
//! logical ports over one message socket, and a libpcap-backed fallback for
//! platforms without suitable raw-socket support. Callers inject and retrieve
//! frames through the engine's `send`/`poll`/`packets` API; they never touch
//! a backend directly.

mod backend;
mod capture;
mod config;
mod engine;
mod error;
mod mask;
mod pcap_tap;
mod poll;
mod port;
mod registry;
mod source;
mod types;

pub use backend::libcapture::LibcaptureBackend;
pub use backend::raw::RawSocketBackend;
pub use backend::virtual_transport::{
    InfoKind, MessageType, VirtualTransportBackend, VirtualTransportSource,
};
pub use config::{EngineConfig, EngineConfigBuilder, Platform};
pub use engine::{Engine, PacketsIter};
pub use error::{BackendError, EngineError, PcapError};
pub use mask::{ByteMask, Mask};
pub use pcap_tap::PcapTap;
pub use poll::{Expected, Filter, PollFailure, PollOutcome, PollRequest, PollSuccess, RecentPacket};
pub use port::{BackendFactory, PortBackend};
pub use source::{PacketSource, RecvOutcome};
pub use types::{DeviceNumber, Frame, PortNumber};
