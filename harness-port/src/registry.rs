// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The port registry: `(device, port) -> backend` and `(device, port) ->
//! bounded queue`. Lives entirely under the engine mutex; see
//! [`crate::engine::Engine`].

use crate::port::PortBackend;
use crate::types::{DeviceNumber, Frame, PortNumber};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

pub type PortKey = (DeviceNumber, PortNumber);

/// One registered port: its backend and its bounded receive queue.
struct PortEntry {
    backend: Arc<dyn PortBackend>,
    queue: VecDeque<(Frame, f64)>,
}

/// `(device, port) -> backend` and `(device, port) -> queue`, with the
/// invariant that a key has exactly one of each for as long as it is
/// registered.
#[derive(Default)]
pub struct PortRegistry {
    ports: HashMap<PortKey, PortEntry>,
    qlen: usize,
}

impl PortRegistry {
    pub fn new(qlen: usize) -> Self {
        Self {
            ports: HashMap::new(),
            qlen,
        }
    }

    pub fn qlen(&self) -> usize {
        self.qlen
    }

    /// Update the per-port queue capacity for every currently- and
    /// subsequently-registered port, trimming any queue that is now over
    /// the new limit.
    pub fn set_qlen(&mut self, qlen: usize) {
        self.qlen = qlen;
        for entry in self.ports.values_mut() {
            while entry.queue.len() > qlen {
                entry.queue.pop_front();
            }
        }
    }

    /// Register `key` with `backend` and an empty queue. Returns `false` if
    /// the key already exists.
    pub fn add(&mut self, key: PortKey, backend: Arc<dyn PortBackend>) -> bool {
        if self.ports.contains_key(&key) {
            return false;
        }
        self.ports.insert(
            key,
            PortEntry {
                backend,
                queue: VecDeque::new(),
            },
        );
        true
    }

    /// Drop `key`'s backend and queue. Returns `false` if absent.
    pub fn remove(&mut self, key: PortKey) -> bool {
        self.ports.remove(&key).is_some()
    }

    pub fn contains(&self, key: PortKey) -> bool {
        self.ports.contains_key(&key)
    }

    pub fn backend(&self, key: PortKey) -> Option<&Arc<dyn PortBackend>> {
        self.ports.get(&key).map(|e| &e.backend)
    }

    /// Every currently-registered port's backend, for the capture loop to
    /// collect into a deduplicated source set.
    pub fn backends(&self) -> impl Iterator<Item = &Arc<dyn PortBackend>> {
        self.ports.values().map(|e| &e.backend)
    }

    /// Append a freshly received frame, dropping the oldest entry if the
    /// queue is now over capacity. No-op (with a debug log) if `key` is no
    /// longer registered, e.g. the port was removed between capture and
    /// enqueue.
    pub fn enqueue(&mut self, key: PortKey, frame: Frame, timestamp: f64) {
        let qlen = self.qlen;
        let Some(entry) = self.ports.get_mut(&key) else {
            debug!(device = key.0, port = key.1, "dropping frame for removed port");
            return;
        };
        entry.queue.push_back((frame, timestamp));
        if entry.queue.len() > qlen {
            entry.queue.pop_front();
        }
    }

    pub fn queue_len(&self, key: PortKey) -> usize {
        self.ports.get(&key).map_or(0, |e| e.queue.len())
    }

    pub fn pop_front(&mut self, key: PortKey) -> Option<(Frame, f64)> {
        self.ports.get_mut(&key).and_then(|e| e.queue.pop_front())
    }

    pub fn peek_front(&self, key: PortKey) -> Option<&(Frame, f64)> {
        self.ports.get(&key).and_then(|e| e.queue.front())
    }

    /// Every `(port, &(frame, ts))` with a non-empty queue head, for `device`.
    pub fn device_heads(&self, device: DeviceNumber) -> impl Iterator<Item = (PortNumber, &(Frame, f64))> {
        self.ports.iter().filter_map(move |((d, p), entry)| {
            if *d != device {
                return None;
            }
            entry.queue.front().map(|head| (*p, head))
        })
    }

    /// Truncate every queue to empty. Counters are owned by the engine, not
    /// the registry, and are left untouched by design.
    pub fn flush(&mut self) {
        for entry in self.ports.values_mut() {
            entry.queue.clear();
        }
    }

    /// Drop every registered port and its backend. Used by `Engine::kill`.
    pub fn clear(&mut self) {
        self.ports.clear();
    }
}
