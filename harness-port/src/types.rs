// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

/// A logical device identifier. Typically 1:1 with a backend instance in the
/// virtual transport.
pub type DeviceNumber = u32;

/// A port number, unique within a device.
pub type PortNumber = u32;

/// An opaque, immutable frame of bytes. The engine never parses this; it only
/// ever forwards it between a backend and a queue.
pub type Frame = bytes::Bytes;
