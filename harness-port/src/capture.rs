// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The background capture loop: multiplexes every live port source plus a
//! wake handle on one `mio::Poll`, drains readable sources under the engine
//! mutex, and enqueues frames.

use crate::engine::Shared;
use crate::source::RecvOutcome;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Readiness wait ceiling, so `kill` and `port_add`/`port_remove` are never
/// starved behind a source that never becomes readable.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Reserved for the wake handle; real sources start at `Token(1)`.
const WAKE_TOKEN: Token = Token(0);

/// Build the wake handle used to interrupt the capture loop's multiplexed
/// wait from any thread, without holding the engine mutex.
pub fn build_waker(poll: &Poll) -> std::io::Result<Waker> {
    Waker::new(poll.registry(), WAKE_TOKEN)
}

/// Run the capture loop until `shared`'s killed flag is set. Spawned as a
/// dedicated OS thread by [`crate::engine::Engine::new`].
pub fn run(shared: Arc<Shared>, mut poll: Poll) {
    let mut events = Events::with_capacity(64);
    let mut registered: HashMap<RawFd, Token> = HashMap::new();
    let mut sources: HashMap<Token, (RawFd, Arc<dyn crate::source::PacketSource>)> = HashMap::new();
    let mut next_token = 1usize;

    loop {
        let wanted: HashMap<RawFd, Arc<dyn crate::source::PacketSource>> = {
            let state = shared.mutex.lock();
            state
                .registry
                .backends()
                .map(|b| b.source())
                .map(|s| (s.wait_fd(), s))
                .collect()
        };

        for fd in registered.keys().copied().collect::<Vec<_>>() {
            if !wanted.contains_key(&fd) {
                let token = registered.remove(&fd).expect("just checked");
                sources.remove(&token);
                if let Err(e) = poll.registry().deregister(&mut SourceFd(&fd)) {
                    trace!(fd, error = %e, "deregister failed (source likely already closed)");
                }
            }
        }
        for (fd, source) in &wanted {
            if registered.contains_key(fd) {
                continue;
            }
            let token = Token(next_token);
            next_token += 1;
            match poll.registry().register(&mut SourceFd(fd), token, Interest::READABLE) {
                Ok(()) => {
                    registered.insert(*fd, token);
                    sources.insert(token, (*fd, Arc::clone(source)));
                }
                Err(e) => error!(fd, error = %e, "failed to register packet source with capture loop"),
            }
        }

        if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            if e.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            error!(error = %e, "capture loop wait failed, terminating");
            return;
        }

        let mut killed_now = false;
        {
            let mut state = shared.mutex.lock();
            for event in &events {
                if event.token() == WAKE_TOKEN {
                    continue;
                }
                let Some((_, source)) = sources.get(&event.token()) else {
                    continue;
                };
                // `mio` readiness is edge-triggered: a source must be drained
                // to "no data" (i.e. would-block) before moving on, or frames
                // already buffered in the kernel when the event fired would
                // sit unread until the next one arrives.
                loop {
                    match source.recv() {
                        Ok(RecvOutcome::NoData) => break,
                        Ok(RecvOutcome::Frame {
                            device,
                            port,
                            frame,
                            timestamp,
                        }) => {
                            if let Some(tap) = state.pcap.as_mut() {
                                if let Err(e) = tap.write(&frame, timestamp, device, port) {
                                    error!(error = %e, "pcap tap write failed");
                                }
                            }
                            state.registry.enqueue((device, port), frame, timestamp);
                            *state.rx_counters.entry((device, port)).or_insert(0) += 1;
                        }
                        Err(e) => {
                            debug!(error = %e, "packet source recv failed, treating as no data");
                            break;
                        }
                    }
                }
            }
            shared.condvar.notify_all();
            killed_now = state.killed;
        }

        if killed_now {
            debug!("capture loop exiting");
            return;
        }
    }
}
