// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The synchronous poll/match engine: wait for a frame satisfying a
//! user-supplied expectation, with bounded timeout and a structured failure
//! carrying enough context to build a useful assertion message.

use crate::mask::Mask;
use crate::types::{DeviceNumber, Frame, PortNumber};
use std::collections::VecDeque;
use std::sync::Arc;

/// The minimum Ethernet frame length, excluding FCS. An `expected` shorter
/// than this is matched against only its own length's worth of the received
/// frame; anything longer is compared exactly.
const MIN_ETHERNET_FRAME_LEN: usize = 60;

/// The number of most-recently-examined, non-matching frames retained for
/// diagnostics on a [`PollFailure`].
const RECENT_PACKETS_CAPACITY: usize = 3;

/// What a [`poll`](crate::Engine::poll) call is waiting for.
#[derive(Clone)]
pub enum Expected {
    /// Byte-for-byte comparison, short-frame padding tolerance per
    /// [`frame_matches`].
    Bytes(Frame),
    /// Delegate to an opaque matcher.
    Mask(Arc<dyn Mask>),
}

impl Expected {
    fn matches(&self, frame: &[u8]) -> bool {
        match self {
            Expected::Mask(mask) => mask.is_valid() && mask.matches(frame),
            Expected::Bytes(expected) => frame_matches(expected, frame),
        }
    }
}

/// Byte-for-byte comparison with the short-frame padding concession: if
/// `expected` is shorter than the minimum Ethernet frame length, only its
/// own length's worth of `frame` is compared and any trailing bytes on the
/// wire (OS-imposed padding) are ignored. A `frame` shorter than a sub-60-byte
/// `expected` is always a non-match, since a short read can never satisfy a
/// longer expectation.
pub fn frame_matches(expected: &[u8], frame: &[u8]) -> bool {
    if expected.len() < MIN_ETHERNET_FRAME_LEN {
        frame.len() >= expected.len() && frame[..expected.len()] == expected[..]
    } else {
        frame == expected
    }
}

/// A predicate applied to every candidate frame in addition to `expected`.
pub type Filter = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Parameters to [`crate::Engine::poll`].
///
/// Built with chained setters (`PollRequest::new().port(1).timeout(...)`) so
/// callers don't have to repeat `device: 0, port: None, ...` at every call
/// site; only the fields that matter for a given assertion need setting.
#[derive(Clone, Default)]
pub struct PollRequest {
    pub device: DeviceNumber,
    pub port: Option<PortNumber>,
    pub timeout: Option<std::time::Duration>,
    pub expected: Option<Expected>,
    pub filters: Vec<Filter>,
}

impl PollRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn device(mut self, device: DeviceNumber) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn port(mut self, port: PortNumber) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn expect_bytes(mut self, expected: impl Into<Frame>) -> Self {
        self.expected = Some(Expected::Bytes(expected.into()));
        self
    }

    #[must_use]
    pub fn expect_mask(mut self, mask: Arc<dyn Mask>) -> Self {
        self.expected = Some(Expected::Mask(mask));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    fn matches(&self, frame: &[u8]) -> bool {
        self.filters.iter().all(|f| f(frame)) && self.expected.as_ref().is_none_or(|e| e.matches(frame))
    }
}

/// One frame retained in a [`PollFailure`]'s diagnostic ring, alongside the
/// port it arrived on.
#[derive(Clone)]
pub struct RecentPacket {
    pub port: PortNumber,
    pub frame: Frame,
    pub timestamp: f64,
}

/// A successful `poll`: the matched frame plus the original expectation, so
/// a formatter can dissect the two against each other.
#[derive(Clone)]
pub struct PollSuccess {
    pub device: DeviceNumber,
    pub port: PortNumber,
    pub frame: Frame,
    pub timestamp: f64,
    pub expected: Option<Expected>,
}

/// A failed `poll`: no field positions for `(device, port, frame, ts)` since
/// none were found, but enough context to render a useful report.
#[derive(Clone)]
pub struct PollFailure {
    pub expected: Option<Expected>,
    pub recent_packets: VecDeque<RecentPacket>,
    pub packet_count: u64,
}

impl PollFailure {
    fn new(expected: Option<Expected>) -> Self {
        Self {
            expected,
            recent_packets: VecDeque::with_capacity(RECENT_PACKETS_CAPACITY),
            packet_count: 0,
        }
    }

    fn record_miss(&mut self, port: PortNumber, frame: Frame, timestamp: f64) {
        self.packet_count += 1;
        if self.recent_packets.len() == RECENT_PACKETS_CAPACITY {
            self.recent_packets.pop_front();
        }
        self.recent_packets.push_back(RecentPacket { port, frame, timestamp });
    }

    /// Render an "EXPECTED / RECEIVED" report with a hex dump of each
    /// recently examined frame. Structured dissection of expected/received
    /// against a packet schema is the external scapy-style dissector's job;
    /// this crate only ever renders the plain bytes.
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str("poll() timed out with no matching frame\n");
        match &self.expected {
            Some(Expected::Bytes(b)) => {
                out.push_str(&format!("EXPECTED ({} bytes):\n{}\n", b.len(), hex_dump(b)));
            }
            Some(Expected::Mask(_)) => out.push_str("EXPECTED: <mask>\n"),
            None => out.push_str("EXPECTED: <any frame matching filters>\n"),
        }
        out.push_str(&format!("examined {} frame(s); most recent mismatches:\n", self.packet_count));
        for pkt in &self.recent_packets {
            out.push_str(&format!(
                "RECEIVED port={} ts={} ({} bytes):\n{}\n",
                pkt.port,
                pkt.timestamp,
                pkt.frame.len(),
                hex_dump(&pkt.frame)
            ));
        }
        out
    }
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|chunk| chunk.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The result of [`crate::Engine::poll`].
#[derive(Clone)]
pub enum PollOutcome {
    Success(PollSuccess),
    Failure(PollFailure),
}

impl PollOutcome {
    /// Backward-compatibility shim for call sites written against the
    /// original's 4-tuple return: `Some((device, port, frame, ts))` on
    /// success, `None` on failure.
    #[must_use]
    pub fn as_tuple(&self) -> Option<(DeviceNumber, PortNumber, Frame, f64)> {
        match self {
            PollOutcome::Success(s) => Some((s.device, s.port, s.frame.clone(), s.timestamp)),
            PollOutcome::Failure(_) => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success(_))
    }
}

/// One (port, frame, timestamp) queue head, used by both `packets()` and the
/// internal poll drain to pick the oldest entry across a device's ports.
pub(crate) struct QueueHead {
    pub port: PortNumber,
    pub frame: Frame,
    pub timestamp: f64,
}

/// Picks, among `candidates`, the one with the smallest timestamp, breaking
/// ties by lowest port number. `candidates` is `(port, &(frame, ts))` pairs
/// from every non-empty queue of one device.
pub(crate) fn pick_oldest<'a>(
    candidates: impl Iterator<Item = (PortNumber, &'a (Frame, f64))>,
) -> Option<PortNumber> {
    candidates
        .min_by(|(port_a, (_, ts_a)), (port_b, (_, ts_b))| {
            ts_a.partial_cmp(ts_b).unwrap_or(std::cmp::Ordering::Equal).then(port_a.cmp(port_b))
        })
        .map(|(port, _)| port)
}

/// Drives one attempt at finding a match, given a closure that dequeues the
/// next candidate frame for a device (see [`crate::engine::Engine`]'s
/// `drain_device`/`drain_port` helpers). Returns `Some(QueueHead)` on the
/// first match, recording every miss into `failure` along the way.
pub(crate) fn drain_and_match(
    request: &PollRequest,
    failure: &mut PollFailure,
    mut next: impl FnMut() -> Option<QueueHead>,
) -> Option<QueueHead> {
    while let Some(head) = next() {
        if request.matches(&head.frame) {
            return Some(head);
        }
        failure.record_miss(head.port, head.frame.clone(), head.timestamp);
    }
    None
}

pub(crate) fn new_failure(expected: Option<Expected>) -> PollFailure {
    PollFailure::new(expected)
}
