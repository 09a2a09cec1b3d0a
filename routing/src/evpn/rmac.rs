// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Submodule to implement a table of EVPN router macs.

#![allow(clippy::collapsible_if)]

use ahash::RandomState;
use net::eth::mac::Mac;
use net::vxlan::Vni;
use std::collections::{HashMap, hash_map::Entry};
use std::net::IpAddr;
use tracing::debug;

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct RmacEntry {
    pub address: IpAddr,
    pub mac: Mac,
    pub vni: Vni,
}
impl RmacEntry {
    fn new(vni: Vni, address: IpAddr, mac: Mac) -> Self {
        Self { address, mac, vni }
    }
}

#[derive(Debug)]
/// Type that represents a collection of EVPN Rmac - IP mappings, per Vni
pub struct RmacStore(HashMap<(IpAddr, Vni), RmacEntry, RandomState>);

#[allow(clippy::new_without_default)]
impl RmacStore {
    //////////////////////////////////////////////////////////////////
    /// Create rmac table
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::with_hasher(RandomState::with_seed(0)))
    }

    //////////////////////////////////////////////////////////////////
    /// Add an rmac entry. Returns an [`RmacEntry`] if some was before
    //////////////////////////////////////////////////////////////////
    pub fn add_rmac(&mut self, vni: Vni, address: IpAddr, mac: Mac) -> Option<RmacEntry> {
        let rmac = RmacEntry::new(vni, address, mac);
        self.0.insert((address, vni), rmac)
    }

    //////////////////////////////////////////////////////////////////
    /// Identical to `add_rmac`, but getting the entry as param
    //////////////////////////////////////////////////////////////////
    pub fn add_rmac_entry(&mut self, entry: RmacEntry) {
        let vni = entry.vni;
        let mac = entry.mac;
        let address = entry.address;
        if self.0.insert((entry.address, entry.vni), entry).is_some() {
            debug!("Updated rmac for vni={vni} ip={address} to {mac}");
        } else {
            debug!("Registered rmac, vni={vni} ip={address} mac={mac}");
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Delete an [`RmacEntry`]. The mac address must match (sanity)
    //////////////////////////////////////////////////////////////////
    pub fn del_rmac(&mut self, vni: Vni, address: IpAddr, mac: Mac) {
        let key = (address, vni);
        if let Entry::Occupied(o) = self.0.entry(key) {
            if o.get().mac == mac {
                self.0.remove_entry(&key);
            }
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Identical to `del_rmac`, but getting the entry as param
    //////////////////////////////////////////////////////////////////
    pub fn del_rmac_entry(&mut self, entry: &RmacEntry) {
        let key = (entry.address, entry.vni);
        if let Entry::Occupied(o) = self.0.entry(key) {
            if o.get().mac == entry.mac {
                self.0.remove_entry(&key);
                debug!(
                    "Removed router-mac entry for vni: {} ip: {} mac: {}",
                    entry.vni, entry.address, entry.mac
                );
            }
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Get an [`RmacEntry`]
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn get_rmac(&self, vni: Vni, address: IpAddr) -> Option<&RmacEntry> {
        self.0.get(&(address, vni))
    }

    //////////////////////////////////////////////////////////////////
    /// Immutable iterator over all [`RmacEntry`]ies
    //////////////////////////////////////////////////////////////////
    pub fn values(&self) -> impl Iterator<Item = &RmacEntry> {
        self.0.values()
    }

    //////////////////////////////////////////////////////////////////
    /// number of rmac entries
    //////////////////////////////////////////////////////////////////
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
