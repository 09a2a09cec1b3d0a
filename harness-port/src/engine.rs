// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The dataplane capture/injection engine: owns the port registry, the
//! background capture loop, and the synchronous poll/match API.

use crate::config::{EngineConfig, Platform};
use crate::error::{EngineError, PcapError};
use crate::pcap_tap::PcapTap;
use crate::poll::{self, PollOutcome, PollRequest, PollSuccess, QueueHead};
use crate::port::{BackendFactory, PortBackend};
use crate::registry::{PortKey, PortRegistry};
use crate::types::{DeviceNumber, Frame, PortNumber};
use crate::{LibcaptureBackend, RawSocketBackend};

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{error, warn};

/// State guarded by [`Shared::mutex`]: the registry, counters, pcap tap, and
/// the shutdown flag. One mutex/condvar pair for everything, matching the
/// distilled spec's single-lock design: the capture loop and every caller
/// contend for the same lock, but hold it only for in-memory bookkeeping,
/// never across a backend's OS call.
pub(crate) struct EngineState {
    pub(crate) registry: PortRegistry,
    pub(crate) rx_counters: HashMap<PortKey, u64>,
    pub(crate) tx_counters: HashMap<PortKey, u64>,
    pub(crate) pcap: Option<PcapTap>,
    pub(crate) killed: bool,
}

pub(crate) struct Shared {
    pub(crate) mutex: Mutex<EngineState>,
    pub(crate) condvar: Condvar,
    waker: mio::Waker,
    capture_thread: Mutex<Option<JoinHandle<()>>>,
}

/// The capture and injection engine. Cheap to clone: every clone shares the
/// same background capture loop and port registry via an `Arc`.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
    platform: Platform,
    port_class: Option<Arc<dyn BackendFactory>>,
    socket_recv_size: usize,
}

impl Engine {
    /// Construct an engine and start its capture loop thread.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let poll = mio::Poll::new().map_err(EngineError::CaptureSetup)?;
        let waker = crate::capture::build_waker(&poll).map_err(EngineError::CaptureSetup)?;

        let shared = Arc::new(Shared {
            mutex: Mutex::new(EngineState {
                registry: PortRegistry::new(config.qlen),
                rx_counters: HashMap::new(),
                tx_counters: HashMap::new(),
                pcap: None,
                killed: false,
            }),
            condvar: Condvar::new(),
            waker,
            capture_thread: Mutex::new(None),
        });

        let capture_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("harness-capture".to_string())
            .spawn(move || crate::capture::run(capture_shared, poll))
            .map_err(EngineError::CaptureSetup)?;
        *shared.capture_thread.lock() = Some(handle);

        Ok(Self {
            shared,
            platform: config.platform,
            port_class: config.port_class,
            socket_recv_size: config.socket_recv_size,
        })
    }

    fn build_backend(&self, interface: &str, device: DeviceNumber, port: PortNumber) -> Result<Arc<dyn PortBackend>, EngineError> {
        if self.platform == Platform::VirtualTransport {
            let factory = self.port_class.as_ref().ok_or(EngineError::VirtualTransportUnavailable)?;
            return factory.build(interface, device, port).map_err(EngineError::from);
        }
        if let Some(factory) = &self.port_class {
            return factory.build(interface, device, port).map_err(EngineError::from);
        }
        #[cfg(target_os = "linux")]
        {
            RawSocketBackend::new(interface, device, port, self.socket_recv_size)
                .map(|b| b as Arc<dyn PortBackend>)
                .map_err(EngineError::from)
        }
        #[cfg(not(target_os = "linux"))]
        {
            LibcaptureBackend::new(interface, device, port)
                .map(|b| b as Arc<dyn PortBackend>)
                .map_err(EngineError::from)
        }
    }

    /// Register a new port, constructing its backend per the platform's
    /// selection policy. Fails if `(device, port)` is already registered.
    pub fn port_add(&self, interface: &str, device: DeviceNumber, port: PortNumber) -> Result<(), EngineError> {
        let backend = self.build_backend(interface, device, port)?;
        {
            let mut state = self.shared.mutex.lock();
            if !state.registry.add((device, port), backend) {
                return Err(EngineError::PortExists { device, port });
            }
        }
        self.wake_capture_loop();
        Ok(())
    }

    /// Remove a registered port, releasing its backend's OS resources.
    /// Returns `false` if the key was not registered.
    pub fn port_remove(&self, device: DeviceNumber, port: PortNumber) -> bool {
        let removed = {
            let mut state = self.shared.mutex.lock();
            state.registry.remove((device, port))
        };
        if removed {
            self.wake_capture_loop();
        }
        removed
    }

    fn wake_capture_loop(&self) {
        if let Err(e) = self.shared.waker.wake() {
            error!(error = %e, "failed to wake capture loop");
        }
    }

    /// Transmit one frame. Logs and returns 0 for an unregistered key rather
    /// than failing, per the distilled spec's "unknown port" handling.
    pub fn send(&self, device: DeviceNumber, port: PortNumber, frame: &[u8]) -> usize {
        let backend = {
            let state = self.shared.mutex.lock();
            match state.registry.backend((device, port)) {
                Some(b) => Arc::clone(b),
                None => {
                    warn!(device, port, "send to unregistered port");
                    return 0;
                }
            }
        };

        {
            let mut state = self.shared.mutex.lock();
            if let Some(tap) = state.pcap.as_mut() {
                if let Err(e) = tap.write(frame, now_secs(), device, port) {
                    error!(error = %e, "pcap tap write failed on send");
                }
            }
        }

        let n = match backend.send(frame) {
            Ok(n) => n,
            Err(e) => {
                error!(device, port, error = %e, "send failed");
                0
            }
        };
        let mut state = self.shared.mutex.lock();
        *state.tx_counters.entry((device, port)).or_insert(0) += 1;
        n
    }

    /// Bring the port's administrative link state up. Panics on an
    /// unregistered key, matching the original's unchecked dict-index
    /// behavior for this call.
    pub fn port_up(&self, device: DeviceNumber, port: PortNumber) {
        let backend = self.backend_or_panic(device, port, "port_up");
        if let Err(e) = backend.up() {
            error!(device, port, error = %e, "port_up failed");
        }
    }

    /// Bring the port's administrative link state down. Panics on an
    /// unregistered key, matching the original's unchecked dict-index
    /// behavior for this call.
    pub fn port_down(&self, device: DeviceNumber, port: PortNumber) {
        let backend = self.backend_or_panic(device, port, "port_down");
        if let Err(e) = backend.down() {
            error!(device, port, error = %e, "port_down failed");
        }
    }

    fn backend_or_panic(&self, device: DeviceNumber, port: PortNumber, op: &'static str) -> Arc<dyn PortBackend> {
        let state = self.shared.mutex.lock();
        match state.registry.backend((device, port)) {
            Some(b) => Arc::clone(b),
            None => panic!("{op} called on unregistered port ({device}, {port})"),
        }
    }

    /// The port's hardware address, or `None` if unregistered/unsupported.
    pub fn get_mac(&self, device: DeviceNumber, port: PortNumber) -> Option<[u8; 6]> {
        let backend = {
            let state = self.shared.mutex.lock();
            Arc::clone(state.registry.backend((device, port))?)
        };
        backend.mac()
    }

    /// `(rx, tx)` counters for a port. Always succeeds; an unregistered key
    /// simply reads as `(0, 0)`.
    pub fn get_counters(&self, device: DeviceNumber, port: PortNumber) -> (u64, u64) {
        let state = self.shared.mutex.lock();
        let rx = state.rx_counters.get(&(device, port)).copied().unwrap_or(0);
        let tx = state.tx_counters.get(&(device, port)).copied().unwrap_or(0);
        (rx, tx)
    }

    /// The virtual transport's most recent control-plane `(rx, tx)`
    /// counters, fetched via an `INFO_REQ`/`INFO_REP` round trip. `None` for
    /// any other backend, an unregistered key, or a timed-out round trip.
    pub fn get_nn_counters(&self, device: DeviceNumber, port: PortNumber) -> Option<(u32, u32)> {
        let backend = {
            let state = self.shared.mutex.lock();
            Arc::clone(state.registry.backend((device, port))?)
        };
        backend.nn_counters()
    }

    /// Truncate every queue to empty. Counters are untouched.
    pub fn flush(&self) {
        self.shared.mutex.lock().registry.flush();
    }

    /// Change the per-port queue capacity, trimming any queue now over the
    /// new limit.
    pub fn set_qlen(&self, qlen: usize) {
        self.shared.mutex.lock().registry.set_qlen(qlen);
    }

    /// The port (within `device`) whose queue head has the smallest
    /// timestamp, i.e. the port [`Engine::packets`] would drain from next.
    /// `None` if `device` has no non-empty queue.
    pub fn oldest_port_number(&self, device: DeviceNumber) -> Option<PortNumber> {
        let state = self.shared.mutex.lock();
        poll::pick_oldest(state.registry.device_heads(device))
    }

    /// Lazily drain `device`'s queues (or just `port`'s, if given) in
    /// arrival order, picking the globally-oldest head across ports when
    /// `port` is `None`.
    pub fn packets(&self, device: DeviceNumber, port: Option<PortNumber>) -> PacketsIter {
        PacketsIter {
            shared: Arc::clone(&self.shared),
            device,
            port,
        }
    }

    /// Block until a frame satisfying `request` is found and dequeued, or
    /// its timeout elapses.
    pub fn poll(&self, request: PollRequest) -> PollOutcome {
        let mut failure = poll::new_failure(request.expected.clone());
        let deadline = request.timeout.map(|t| Instant::now() + t);

        loop {
            let mut state = self.shared.mutex.lock();
            let found = poll::drain_and_match(&request, &mut failure, || {
                drain_next(&mut state.registry, request.device, request.port)
            });
            if let Some(head) = found {
                return PollOutcome::Success(PollSuccess {
                    device: request.device,
                    port: head.port,
                    frame: head.frame,
                    timestamp: head.timestamp,
                    expected: request.expected.clone(),
                });
            }

            match deadline {
                None => {
                    self.shared.condvar.wait(&mut state);
                }
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return PollOutcome::Failure(failure);
                    }
                    self.shared.condvar.wait_for(&mut state, remaining);
                }
            }
        }
    }

    /// Enable the pcap write-through tap. Panics if a tap is already active,
    /// matching the original's bare precondition assertion.
    pub fn start_pcap(&self, path: impl AsRef<Path>) -> Result<(), PcapError> {
        let mut state = self.shared.mutex.lock();
        assert!(state.pcap.is_none(), "start_pcap called while a tap is already active");
        state.pcap = Some(PcapTap::open(path)?);
        Ok(())
    }

    /// Flush and detach the active pcap tap, if any. A no-op if none is
    /// active.
    pub fn stop_pcap(&self) {
        if let Some(tap) = self.shared.mutex.lock().pcap.take() {
            tap.close();
        }
    }

    /// Stop the capture loop, release every backend, and join the capture
    /// thread. A second call is a safe no-op.
    pub fn kill(&self) {
        {
            let mut state = self.shared.mutex.lock();
            if state.killed {
                return;
            }
            state.killed = true;
        }
        self.wake_capture_loop();
        if let Some(handle) = self.shared.capture_thread.lock().take() {
            if let Err(e) = handle.join() {
                error!(?e, "capture loop thread panicked");
            }
        }
        self.shared.mutex.lock().registry.clear();
        self.shared.condvar.notify_all();
    }
}

fn drain_next(registry: &mut PortRegistry, device: DeviceNumber, port: Option<PortNumber>) -> Option<QueueHead> {
    match port {
        Some(p) => registry
            .pop_front((device, p))
            .map(|(frame, timestamp)| QueueHead { port: p, frame, timestamp }),
        None => {
            let picked = poll::pick_oldest(registry.device_heads(device))?;
            registry
                .pop_front((device, picked))
                .map(|(frame, timestamp)| QueueHead { port: picked, frame, timestamp })
        }
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Lazy drain iterator returned by [`Engine::packets`].
pub struct PacketsIter {
    shared: Arc<Shared>,
    device: DeviceNumber,
    port: Option<PortNumber>,
}

impl Iterator for PacketsIter {
    type Item = (PortNumber, Frame, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let mut state = self.shared.mutex.lock();
        drain_next(&mut state.registry, self.device, self.port).map(|h| (h.port, h.frame, h.timestamp))
    }
}
