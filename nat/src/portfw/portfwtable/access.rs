// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port forwarding table objects for concurrent accesses
//! from datapath and configuration / management

use super::PortFwTableError;
use super::objects::{PortFwEntry, PortFwTable};
use left_right::{Absorb, ReadGuard, ReadHandle, ReadHandleFactory, WriteHandle};

#[allow(unused)]
use tracing::{debug, error, warn};

enum PortFwTableChange {
    Update(Vec<PortFwEntry>),
}

impl Absorb<PortFwTableChange> for PortFwTable {
    fn absorb_first(&mut self, operation: &mut PortFwTableChange, _other: &Self) {
        match operation {
            PortFwTableChange::Update(ruleset) => self.update(&ruleset.clone()),
        }
    }
    fn sync_with(&mut self, _first: &Self) {}
}

pub struct PortFwTableWriter(WriteHandle<PortFwTable, PortFwTableChange>);
pub struct PortFwTableReader(ReadHandle<PortFwTable>);

#[allow(clippy::unnecessary_wraps)]
fn validate_ruleset(_ruleset: &[PortFwEntry]) -> Result<(), PortFwTableError> {
    debug!("Validating port-forwarding ruleset...");
    // deferring the implementation of this since it will change
    // when we introduce port ranges
    Ok(())
}

impl PortFwTableWriter {
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> PortFwTableWriter {
        let (mut write, _) = left_right::new::<PortFwTable, PortFwTableChange>();
        write.publish();
        PortFwTableWriter(write)
    }
    #[must_use]
    pub fn enter(&self) -> Option<ReadGuard<'_, PortFwTable>> {
        self.0.enter()
    }
    #[must_use]
    pub fn reader(&self) -> PortFwTableReader {
        PortFwTableReader(self.0.clone())
    }
    pub fn update_table(&mut self, ruleset: &[PortFwEntry]) -> Result<(), PortFwTableError> {
        validate_ruleset(ruleset)?;
        self.0.append(PortFwTableChange::Update(ruleset.to_vec()));
        self.0.publish();
        self.0.publish(); // intended
        Ok(())
    }
}

#[derive(Debug)]
pub struct PortFwTableReaderFactory(ReadHandleFactory<PortFwTable>);
impl PortFwTableReaderFactory {
    #[must_use]
    pub fn handle(&self) -> PortFwTableReader {
        PortFwTableReader(self.0.handle())
    }
}

impl PortFwTableReader {
    #[must_use]
    pub fn enter(&self) -> Option<ReadGuard<'_, PortFwTable>> {
        self.0.enter()
    }
    #[must_use]
    pub fn factory(&self) -> PortFwTableReaderFactory {
        PortFwTableReaderFactory(self.0.factory())
    }
}
