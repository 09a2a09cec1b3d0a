// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! State objects to keep adjacency information

use crate::interface::IfIndex;
use net::eth::mac::Mac;
use std::collections::HashMap;
use std::net::IpAddr;

#[allow(dead_code)]
pub struct Adjacency {
    address: IpAddr,
    ifindex: IfIndex,
    mac: Mac,
}

#[allow(dead_code)]
impl Adjacency {
    fn new(address: IpAddr, ifindex: IfIndex, mac: Mac) -> Self {
        Self {
            address,
            ifindex,
            mac,
        }
    }
}

pub struct AdjacencyTable(HashMap<(IfIndex, IpAddr), Adjacency>);

#[allow(dead_code)]
impl AdjacencyTable {
    pub(crate) fn new() -> Self {
        Self(HashMap::new())
        // Todo: use a fast hasher
    }
}

#[allow(dead_code)]
impl AdjacencyTable {
    pub(crate) fn add_adjacency(&mut self, adjacency: Adjacency) {
        self.0
            .insert((adjacency.ifindex, adjacency.address), adjacency);
    }
    pub fn del_adjacency(&mut self, address: IpAddr, ifindex: IfIndex) {
        self.0.remove(&(ifindex, address));
    }
    pub fn get_adjacency(&self, address: IpAddr, ifindex: IfIndex) -> Option<&Adjacency> {
        self.0.get(&(ifindex, address))
    }
}
