// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Write-through pcap tap: every captured and transmitted frame is appended
//! to a classic-format pcap file while the tap is active.

use crate::error::PcapError;
use crate::types::{DeviceNumber, PortNumber};
use pcap_file::pcap::{PcapPacket, PcapWriter};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// A single active pcap sink. The engine holds at most one of these at a
/// time; `(device, port)` is not part of the classic pcap record format, so
/// it is dropped at the tap boundary (matching the distilled spec's
/// "opaque sink" treatment of the file itself).
pub struct PcapTap {
    writer: PcapWriter<File>,
    path: String,
}

impl PcapTap {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PcapError> {
        let path_str = path.as_ref().display().to_string();
        let file = File::create(path.as_ref()).map_err(|source| PcapError::Open {
            path: path_str.clone(),
            source,
        })?;
        let writer = PcapWriter::new(file).map_err(|e| PcapError::Write(e.to_string()))?;
        debug!(path = %path_str, "pcap tap opened");
        Ok(Self { writer, path: path_str })
    }

    /// Append one frame. `device`/`port` are accepted for a future per-link
    /// annotation but are not encoded in the classic pcap format, same as
    /// the distilled spec's treatment of the sink as an opaque `write(frame,
    /// ts, device, port)` call.
    pub fn write(
        &mut self,
        frame: &[u8],
        timestamp: f64,
        _device: DeviceNumber,
        _port: PortNumber,
    ) -> Result<(), PcapError> {
        let packet = PcapPacket::new(Duration::from_secs_f64(timestamp.max(0.0)), frame.len() as u32, Cow::Borrowed(frame));
        self.writer.write_packet(&packet).map_err(|e| PcapError::Write(e.to_string()))
    }

    pub fn close(self) {
        debug!(path = %self.path, "pcap tap closed");
        // Dropping `self.writer` flushes and closes the underlying file.
    }
}
