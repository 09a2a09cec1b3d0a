// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw-socket port backend: one `AF_PACKET` socket per port, bound to a named
//! Linux kernel interface.

use crate::error::BackendError;
use crate::port::PortBackend;
use crate::source::{PacketSource, RecvOutcome};
use crate::types::Frame;

use afpacket::sync::RawPacketStream;
use parking_lot::Mutex;
use std::ffi::CString;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Default per-`recv` buffer size, matching the original's `RCV_SIZE_DEFAULT`.
pub const DEFAULT_RECV_SIZE: usize = 4096;

/// Frames shorter than this are logged as suspect on send: some Linux kernels
/// silently refuse to transmit them.
const MIN_SAFE_SEND_LEN: usize = 15;

// Linux `AF_PACKET` socket-level option, from `linux/if_packet.h`. Not
// exposed by the `libc` crate, so the values are reproduced here directly;
// they are stable ABI and have not changed across kernel versions.
const SOL_PACKET: libc::c_int = 263;
const PACKET_AUXDATA: libc::c_int = 8;

fn enable_auxdata(fd: RawFd) -> std::io::Result<()> {
    let enable: libc::c_int = 1;
    // SAFETY: `fd` is a valid, open socket for the lifetime of this call, and
    // `enable` is a plain `c_int` whose address and size are passed
    // correctly to `setsockopt`.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            SOL_PACKET,
            PACKET_AUXDATA,
            std::ptr::addr_of!(enable).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn set_promiscuous(fd: RawFd, ifindex: libc::c_int) -> std::io::Result<()> {
    let mreq = libc::packet_mreq {
        mr_ifindex: ifindex,
        mr_type: libc::PACKET_MR_PROMISC as u16,
        mr_alen: 0,
        mr_address: [0; 8],
    };
    // SAFETY: `mreq` is fully initialized and its size matches the option
    // value expected by the kernel for `PACKET_ADD_MEMBERSHIP`.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            SOL_PACKET,
            libc::PACKET_ADD_MEMBERSHIP,
            std::ptr::addr_of!(mreq).cast(),
            std::mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn ifindex_of(name: &str) -> Option<libc::c_int> {
    let cname = CString::new(name).ok()?;
    // SAFETY: `cname` is a valid, NUL-terminated C string for the duration
    // of the call.
    let idx = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if idx == 0 { None } else { Some(idx as libc::c_int) }
}

/// Read the hardware address of `name` via `SIOCGIFHWADDR`.
fn read_mac(name: &str) -> Option<[u8; 6]> {
    let sock = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if sock < 0 {
        return None;
    }
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }
    // SAFETY: `ifr` is a correctly sized, zero-initialized `ifreq` and
    // `sock` is a valid, freshly opened datagram socket used only for this
    // ioctl.
    let rc = unsafe { libc::ioctl(sock, libc::SIOCGIFHWADDR, std::ptr::addr_of_mut!(ifr)) };
    let mac = if rc == 0 {
        // SAFETY: on success the kernel has populated `ifr_hwaddr` per the
        // ioctl contract.
        let sa = unsafe { ifr.ifr_ifru.ifru_hwaddr };
        let mut out = [0u8; 6];
        for (dst, src) in out.iter_mut().zip(sa.sa_data.iter()) {
            *dst = *src as u8;
        }
        Some(out)
    } else {
        None
    };
    unsafe { libc::close(sock) };
    mac
}

fn set_link_flag(name: &str, up: bool) -> std::io::Result<()> {
    let sock = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if sock < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }
    let res = (|| {
        // SAFETY: `ifr` is fully initialized with the interface name; we only
        // read `ifru_flags` after a successful `SIOCGIFFLAGS`.
        if unsafe { libc::ioctl(sock, libc::SIOCGIFFLAGS, std::ptr::addr_of_mut!(ifr)) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        let flags = unsafe { ifr.ifr_ifru.ifru_flags };
        let flags = if up {
            flags | libc::IFF_UP as i16
        } else {
            flags & !(libc::IFF_UP as i16)
        };
        // SAFETY: `ifru_flags` is the active union member, matching the read above.
        unsafe {
            ifr.ifr_ifru.ifru_flags = flags;
        }
        // SAFETY: same `ifr` buffer, now carrying the updated flag word.
        if unsafe { libc::ioctl(sock, libc::SIOCSIFFLAGS, std::ptr::addr_of_mut!(ifr)) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    })();
    unsafe { libc::close(sock) };
    res
}

/// A raw `AF_PACKET` socket bound to a single Linux interface. It is both a
/// [`PortBackend`] and its own [`PacketSource`], matching the original
/// `DataPlanePortLinux`'s self-sourcing.
pub struct RawSocketBackend {
    interface: String,
    device: u32,
    port: u32,
    recv_size: usize,
    sock: Mutex<RawPacketStream>,
    raw_fd: RawFd,
    weak_self: Weak<RawSocketBackend>,
}

impl RawSocketBackend {
    pub fn new(interface: &str, device: u32, port: u32, recv_size: usize) -> Result<Arc<Self>, BackendError> {
        let mut sock = RawPacketStream::new().map_err(|source| BackendError::RawSocketOpen {
            interface: interface.to_string(),
            source,
        })?;
        sock.set_non_blocking();
        sock.bind(interface)
            .map_err(|source| BackendError::RawSocketOpen {
                interface: interface.to_string(),
                source,
            })?;
        let raw_fd = sock.as_raw_fd();

        if let Err(source) = enable_auxdata(raw_fd) {
            warn!(interface, %source, "failed to enable PACKET_AUXDATA; VLAN tags may be stripped");
        }
        if let Some(ifindex) = ifindex_of(interface) {
            if let Err(source) = set_promiscuous(raw_fd, ifindex) {
                return Err(BackendError::Ioctl {
                    op: "PACKET_ADD_MEMBERSHIP",
                    interface: interface.to_string(),
                    source,
                });
            }
        } else {
            return Err(BackendError::RawSocketOpen {
                interface: interface.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        debug!(interface, device, port, "raw-socket backend opened");
        Ok(Arc::new_cyclic(|weak_self| Self {
            interface: interface.to_string(),
            device,
            port,
            recv_size,
            sock: Mutex::new(sock),
            raw_fd,
            weak_self: weak_self.clone(),
        }))
    }
}

impl PacketSource for RawSocketBackend {
    fn wait_fd(&self) -> RawFd {
        self.raw_fd
    }

    fn recv(&self) -> Result<RecvOutcome, BackendError> {
        let mut buf = vec![0u8; self.recv_size];
        let mut sock = self.sock.lock();
        match sock.read(&mut buf) {
            Ok(0) => Ok(RecvOutcome::NoData),
            Ok(n) => {
                buf.truncate(n);
                Ok(RecvOutcome::Frame {
                    device: self.device,
                    port: self.port,
                    frame: Frame::from(buf),
                    timestamp: now_secs(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(RecvOutcome::NoData),
            Err(e) => {
                error!(interface = %self.interface, error = %e, "raw-socket read failed");
                Ok(RecvOutcome::NoData)
            }
        }
    }
}

impl PortBackend for RawSocketBackend {
    fn source(&self) -> Arc<dyn PacketSource> {
        self.weak_self
            .upgrade()
            .expect("backend outlives its own source handle")
    }

    fn send(&self, frame: &[u8]) -> Result<usize, BackendError> {
        if frame.len() < MIN_SAFE_SEND_LEN {
            warn!(
                interface = %self.interface,
                len = frame.len(),
                "the linux kernel may not send packets smaller than 15 bytes"
            );
        }
        let mut sock = self.sock.lock();
        let n = sock.write(frame).map_err(|source| BackendError::Send {
            interface: self.interface.clone(),
            source,
        })?;
        if n != frame.len() {
            error!(
                interface = %self.interface,
                sent = n,
                expected = frame.len(),
                "short send on raw socket"
            );
        }
        Ok(n)
    }

    fn up(&self) -> Result<(), BackendError> {
        set_link_flag(&self.interface, true).map_err(|source| BackendError::Ioctl {
            op: "SIOCSIFFLAGS(up)",
            interface: self.interface.clone(),
            source,
        })
    }

    fn down(&self) -> Result<(), BackendError> {
        set_link_flag(&self.interface, false).map_err(|source| BackendError::Ioctl {
            op: "SIOCSIFFLAGS(down)",
            interface: self.interface.clone(),
            source,
        })
    }

    fn mac(&self) -> Option<[u8; 6]> {
        read_mac(&self.interface)
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
