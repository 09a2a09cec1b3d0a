// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Errors raised while constructing or operating a [`crate::PortBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to open raw socket on interface '{interface}': {source}")]
    RawSocketOpen {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ioctl '{op}' failed on interface '{interface}': {source}")]
    Ioctl {
        op: &'static str,
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("send failed on interface '{interface}': {source}")]
    Send {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("virtual-transport connection error: {0}")]
    Transport(String),

    #[error("libpcap error: {0}")]
    Pcap(String),
}

/// Errors raised by the engine's own lifecycle and port-registry operations
/// (as opposed to a single backend's I/O, which is [`BackendError`]).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("port ({device}, {port}) is already registered")]
    PortExists { device: u32, port: u32 },

    #[error("platform requires the virtual transport but no backend factory was configured")]
    VirtualTransportUnavailable,

    #[error("failed to construct capture-loop wait primitives: {0}")]
    CaptureSetup(std::io::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised by the pcap tap writer.
#[derive(Debug, Error)]
pub enum PcapError {
    #[error("failed to open pcap file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write pcap record: {0}")]
    Write(String),
}
