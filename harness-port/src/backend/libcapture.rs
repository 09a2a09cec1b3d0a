// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Library-capture port backend: a libpcap-backed fallback for platforms or
//! interfaces the raw-socket backend cannot bind directly (e.g. non-Ethernet
//! link types, or systems without `AF_PACKET`).

use crate::error::BackendError;
use crate::port::PortBackend;
use crate::source::{PacketSource, RecvOutcome};
use crate::types::{DeviceNumber, Frame, PortNumber};

use parking_lot::Mutex;
use pcap::{Active, Capture, Device};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Default snapshot length for captured frames.
const SNAPLEN: i32 = 65535;

/// A port backed by a `pcap` capture handle in non-blocking mode.
pub struct LibcaptureBackend {
    interface: String,
    device: DeviceNumber,
    port: PortNumber,
    cap: Mutex<Capture<Active>>,
    raw_fd: RawFd,
    weak_self: Weak<LibcaptureBackend>,
}

impl LibcaptureBackend {
    pub fn new(interface: &str, device: DeviceNumber, port: PortNumber) -> Result<Arc<Self>, BackendError> {
        let dev = Device::list()
            .map_err(|e| BackendError::Pcap(format!("device enumeration failed: {e}")))?
            .into_iter()
            .find(|d| d.name == interface)
            .ok_or_else(|| BackendError::Pcap(format!("no such pcap device: {interface}")))?;

        let cap = Capture::from_device(dev)
            .map_err(|e| BackendError::Pcap(format!("capture setup failed: {e}")))?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(0)
            .immediate_mode(true)
            .open()
            .map_err(|e| BackendError::Pcap(format!("capture open failed: {e}")))?;

        let cap = cap
            .setnonblock()
            .map_err(|e| BackendError::Pcap(format!("nonblocking mode failed: {e}")))?;

        let raw_fd = cap.as_raw_fd();
        debug!(interface, device, port, "libcapture backend opened");
        Ok(Arc::new_cyclic(|weak_self| Self {
            interface: interface.to_string(),
            device,
            port,
            cap: Mutex::new(cap),
            raw_fd,
            weak_self: weak_self.clone(),
        }))
    }
}

impl PacketSource for LibcaptureBackend {
    fn wait_fd(&self) -> RawFd {
        self.raw_fd
    }

    fn recv(&self) -> Result<RecvOutcome, BackendError> {
        let mut cap = self.cap.lock();
        match cap.next_packet() {
            Ok(packet) => Ok(RecvOutcome::Frame {
                device: self.device,
                port: self.port,
                frame: Frame::copy_from_slice(packet.data),
                timestamp: packet.header.ts.tv_sec as f64 + packet.header.ts.tv_usec as f64 / 1_000_000.0,
            }),
            Err(pcap::Error::TimeoutExpired) => Ok(RecvOutcome::NoData),
            Err(pcap::Error::NoMorePackets) => Ok(RecvOutcome::NoData),
            Err(e) => {
                error!(interface = %self.interface, error = %e, "pcap read failed");
                Ok(RecvOutcome::NoData)
            }
        }
    }
}

impl PortBackend for LibcaptureBackend {
    fn source(&self) -> Arc<dyn PacketSource> {
        self.weak_self
            .upgrade()
            .expect("backend outlives its own source handle")
    }

    fn send(&self, frame: &[u8]) -> Result<usize, BackendError> {
        let mut cap = self.cap.lock();
        cap.sendpacket(frame)
            .map_err(|e| BackendError::Send {
                interface: self.interface.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;
        Ok(frame.len())
    }

    fn up(&self) -> Result<(), BackendError> {
        // libpcap has no administrative up/down concept; interface state is
        // managed by whatever owns the device outside this backend.
        Ok(())
    }

    fn down(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn mac(&self) -> Option<[u8; 6]> {
        None
    }
}
