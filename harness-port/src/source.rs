// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::BackendError;
use crate::types::{DeviceNumber, Frame, PortNumber};
use std::os::fd::RawFd;

/// The outcome of one [`PacketSource::recv`] call.
pub enum RecvOutcome {
    /// A data frame was received for a currently-registered port.
    Frame {
        device: DeviceNumber,
        port: PortNumber,
        frame: Frame,
        timestamp: f64,
    },
    /// Nothing useful to hand back: either the underlying read would block,
    /// or the readable event corresponded to a control message rather than a
    /// data frame.
    NoData,
}

/// The receive-and-wait half of a backend.
///
/// Several ports may share one source (the virtual transport shares one
/// source per `(device, endpoint-address)`). The capture loop deduplicates
/// sources by [`PacketSource::wait_fd`] before waiting on them, so two
/// `Arc`-shared handles to the same underlying source must return the same
/// descriptor.
pub trait PacketSource: Send + Sync {
    /// The OS-level readiness descriptor to register with the capture loop's
    /// multiplexed wait.
    fn wait_fd(&self) -> RawFd;

    /// Receive one message. Must not block for long once the descriptor has
    /// been reported readable.
    fn recv(&self) -> Result<RecvOutcome, BackendError>;
}
