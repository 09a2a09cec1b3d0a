// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::BackendError;
use crate::source::PacketSource;
use std::sync::Arc;

/// The capture/injection contract common to every port backend.
pub trait PortBackend: Send + Sync {
    /// The packet source to register with the capture loop for this port.
    /// May be shared with other ports (the virtual transport shares one
    /// source across every port of a device).
    fn source(&self) -> Arc<dyn PacketSource>;

    /// Transmit one frame; returns the number of bytes accepted by the OS or
    /// transport.
    fn send(&self, frame: &[u8]) -> Result<usize, BackendError>;

    /// Bring the administrative link state up.
    fn up(&self) -> Result<(), BackendError>;

    /// Bring the administrative link state down.
    fn down(&self) -> Result<(), BackendError>;

    /// The port's hardware address, or `None` if unknown/unsupported.
    fn mac(&self) -> Option<[u8; 6]>;

    /// The backend's most recent `(rx, tx)` control-plane counters, fetched
    /// via an out-of-band round trip. Only the virtual transport supports
    /// this; every other backend reports `None`.
    fn nn_counters(&self) -> Option<(u32, u32)> {
        None
    }
}

/// A pluggable factory for custom port backends, the Rust equivalent of the
/// distilled spec's `dataplane.portclass` configuration hook.
pub trait BackendFactory: Send + Sync {
    /// Construct a backend bound to `interface` for `(device, port)`.
    fn build(
        &self,
        interface: &str,
        device: u32,
        port: u32,
    ) -> Result<Arc<dyn PortBackend>, BackendError>;
}
