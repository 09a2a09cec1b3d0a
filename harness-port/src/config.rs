// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed, programmatically constructed engine configuration.
//!
//! No CLI parsing or config-file format lives here; loading one of those
//! into an [`EngineConfig`] is the test-runner's job.

use crate::port::BackendFactory;
use derive_builder::Builder;
use std::sync::Arc;

/// Which backend family new ports are constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Select by host OS: raw-socket backend on Linux, libcapture elsewhere.
    #[default]
    Auto,
    /// Force the virtual-transport backend. Requires `port_class` to be set,
    /// since this crate owns no DUT-side simulator to dial automatically.
    VirtualTransport,
}

/// Engine-wide, programmatically built configuration.
///
/// Mirrors the distilled spec's recognized configuration keys
/// (`platform`, `dataplane.portclass`, `socket_recv_size`, `qlen`) as typed
/// fields rather than a loosely typed key/value map.
#[derive(Builder, Clone)]
#[builder(pattern = "owned", setter(into, strip_option), build_fn(skip))]
pub struct EngineConfig {
    /// Backend-selection policy. Default: [`Platform::Auto`].
    pub platform: Platform,
    /// Custom backend factory, overriding OS-based selection. Required when
    /// `platform` is [`Platform::VirtualTransport`].
    pub port_class: Option<Arc<dyn BackendFactory>>,
    /// Per-`recv` buffer size for the raw-socket backend.
    pub socket_recv_size: usize,
    /// Per-port queue capacity. See [`crate::Engine::set_qlen`] to change it
    /// after construction.
    pub qlen: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Auto,
            port_class: None,
            socket_recv_size: crate::backend::raw::DEFAULT_RECV_SIZE,
            qlen: 100,
        }
    }
}

impl EngineConfigBuilder {
    /// Build the config, filling in defaults for any field left unset.
    pub fn build(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            platform: self.platform.unwrap_or(default.platform),
            port_class: self.port_class.clone().unwrap_or(default.port_class),
            socket_recv_size: self.socket_recv_size.unwrap_or(default.socket_recv_size),
            qlen: self.qlen.unwrap_or(default.qlen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_distilled_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.platform, Platform::Auto);
        assert_eq!(config.socket_recv_size, 4096);
        assert_eq!(config.qlen, 100);
        assert!(config.port_class.is_none());
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let config = EngineConfigBuilder::default().qlen(8_usize).build();
        assert_eq!(config.qlen, 8);
        assert_eq!(config.platform, Platform::Auto);
    }
}
