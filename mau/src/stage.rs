//! One MAU stage.
//!
//! [`MauStage::configure`] needs `&mut self` and [`MauStage::process`] only `&self`, so a configuration write can
//! never interleave with a traversal in flight. A traversal is a pure function of the stage configuration and
//! the incoming header vector.

use std::array;

use thiserror::Error;

use crate::action::Inputs;
use crate::adist::{ActionDataAddress, AddressOrigin, DerivedAddresses, ResultBus};
use crate::config::{ConfigError, ConfigUnit, StageConfig};
use crate::constants::ixbar::{EXACT_BYTES, TCAM_BYTES};
use crate::constants::table::LOGICAL_TABLES;
use crate::diagnostic::{self, Diagnostic};
use crate::exact::{self, ExactHit};
use crate::ixbar::{ByteSource, InputXbar};
use crate::phv::{ContainerId, HeaderVectorContainer, Phv, PhvError};
use crate::predication::Merge;
use crate::sram::UnitRamUse;
use crate::tcam::TcamAddress;
use crate::xbar::HomeBuses;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("malformed header vector: {0}")]
    MalformedHeaderVector(#[from] PhvError),
    #[error("crossbar byte {byte} reads container {container}, which the header vector does not carry")]
    MissingContainer { container: ContainerId, byte: usize },
}

/// What one logical table did in a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOutcome {
    /// Logical table.
    pub table: usize,
    /// Whether the table took part.
    pub enabled: bool,
    /// Result bus the table drives.
    pub result_bus: ResultBus,
    /// Matcher that produced the hit, `None` on a miss.
    pub origin: Option<AddressOrigin>,
    /// Raw match address, `None` on a miss.
    pub raw: Option<u32>,
    /// Winning TCAM word, if the ternary matcher hit.
    pub tcam_hit: Option<TcamAddress>,
    /// Winning way, if the exact-match engine hit.
    pub exact_hit: Option<ExactHit>,
    /// Derived addresses.
    pub addresses: DerivedAddresses,
    /// Physical action-data location.
    pub action_data: Option<ActionDataAddress>,
}

impl TableOutcome {
    /// Whether the table hit.
    pub fn hit(&self) -> bool { self.raw.is_some() }
}

/// Result of one traversal.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// Outgoing header vector.
    pub phv: Phv,
    /// Outcome per logical table.
    pub tables: [TableOutcome; LOGICAL_TABLES],
    /// Ambiguities met during the traversal.
    pub diagnostics: Vec<Diagnostic>,
}

/// One MAU stage: configuration plus the diagnostics raised while configuring it.
#[derive(Debug, Clone, Default)]
pub struct MauStage {
    config: StageConfig,
    diagnostics: Vec<Diagnostic>,
}

fn check_sources<const N: usize>(xbar: &InputXbar<N>, phv: &Phv) -> Result<(), ProcessError> {
    for byte in 0..N {
        if let Some(ByteSource { container, .. }) = xbar.source(byte) {
            if !phv.is_valid(container) {
                return Err(ProcessError::MissingContainer { container, byte });
            }
        }
    }
    Ok(())
}

impl MauStage {
    /// Creates an unconfigured stage. Every table is disabled.
    pub fn new() -> Self { Self::default() }

    /// Applies one configuration write. It is visible to every later traversal.
    pub fn configure(&mut self, unit: ConfigUnit) -> Result<(), ConfigError> {
        self.config.apply(unit, &mut self.diagnostics)
    }

    /// Current configuration.
    pub fn config(&self) -> &StageConfig { &self.config }

    /// Drains the diagnostics raised while configuring.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> { std::mem::take(&mut self.diagnostics) }

    /// Runs a container set handed over by the parser through the stage.
    pub fn process_containers<I>(&self, containers: I) -> Result<StageOutput, ProcessError>
    where I: IntoIterator<Item = HeaderVectorContainer> {
        let phv = Phv::from_containers(containers)?;
        self.process(&phv)
    }

    /// Runs one header vector through the stage.
    pub fn process(&self, phv: &Phv) -> Result<StageOutput, ProcessError> {
        let config = &self.config;
        check_sources(&config.exact_xbar, phv)?;
        check_sources(&config.tcam_xbar, phv)?;

        let exact_bytes = config.exact_xbar.assemble(phv);
        let tcam_bytes = config.tcam_xbar.assemble(phv);
        let mut diagnostics = Vec::new();
        let mut buses = HomeBuses::default();

        let tables: [TableOutcome; LOGICAL_TABLES] = array::from_fn(|table| {
            let outcome = self.lookup(table, &exact_bytes, &tcam_bytes, &mut diagnostics);
            if let Some(address) = &outcome.action_data {
                self.fetch_action_data(table, address, &mut buses, &mut diagnostics);
            }
            outcome
        });

        buses.report_collisions(&mut diagnostics);
        let adb = config.crossbar.route(&buses);

        let mut merge = Merge::default();
        for outcome in tables.iter().filter(|outcome| outcome.enabled) {
            let table = &config.tables[outcome.table];
            let instruction = crate::some_or!(config.imem.fetch(outcome.addresses.instruction), continue);
            let inputs = Inputs { phv, adb: &adb, immediate: outcome.addresses.immediate_data };
            for (container, value) in instruction.execute(inputs) {
                merge.offer(container, outcome.table, table.predication, value);
            }
        }
        let phv = merge.resolve(phv, &mut diagnostics);

        Ok(StageOutput { phv, tables, diagnostics })
    }

    fn lookup(
        &self, table: usize, exact_bytes: &[u8; EXACT_BYTES], tcam_bytes: &[u8; TCAM_BYTES],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableOutcome {
        let config = &self.config;
        let logical = &config.tables[table];
        if !logical.enabled {
            return TableOutcome { table, result_bus: ResultBus::of(table), ..Default::default() };
        }

        let ways = logical.configured_ways();
        let hits = exact::lookup(table, ways, &config.sram, &config.hash, exact_bytes, diagnostics);
        if hits.len() > 1 {
            let ways = hits.iter().map(|hit| hit.way).collect();
            diagnostic::raise(diagnostics, Diagnostic::MultipleWayHits { table, ways });
        }
        let exact_hit = hits.first().copied();
        let tcam_hit = config.tcam.lookup(table, tcam_bytes);

        let (origin, raw) = match (exact_hit, tcam_hit) {
            (Some(hit), _) => (AddressOrigin::Exact, Some(hit.raw())),
            (None, Some(address)) => (AddressOrigin::Tcam, Some(address.raw())),
            (None, None) => (config.miss_origin(table), None),
        };
        let addresses = config.adist.derive(table, origin, raw).unwrap_or_default();
        let action_data = config.adist.action_data(table, origin, &addresses);

        match raw {
            Some(raw) => log::debug!("table {}: {:?} hit at {:#x}", table, origin, raw),
            None => log::debug!("table {}: miss", table),
        }

        TableOutcome {
            table,
            enabled: true,
            result_bus: ResultBus::of(table),
            origin: raw.map(|_| origin),
            raw,
            tcam_hit: if exact_hit.is_none() { tcam_hit } else { None },
            exact_hit,
            addresses,
            action_data,
        }
    }

    /// Drives a table's action-data lane onto the home bus of the RAM holding it.
    fn fetch_action_data(
        &self, table: usize, address: &ActionDataAddress, buses: &mut HomeBuses, diagnostics: &mut Vec<Diagnostic>,
    ) {
        let sram = &self.config.sram;
        let mut action_rams = sram.rams_of(table).filter_map(|(ram, usage)| match usage {
            UnitRamUse::ActionData { vpn, .. } => Some((ram, u32::from(vpn))),
            _ => None,
        });
        let mut any = false;
        let found = action_rams.find(|&(_, vpn)| {
            any = true;
            vpn == address.ram_vpn
        });
        match found {
            Some((ram, _)) => buses.drive(ram.home_bus(), table, address.extract(sram.word(ram, address.row))),
            None if any => {
                diagnostic::raise(diagnostics, Diagnostic::ActionDataUnmapped { table, vpn: address.ram_vpn })
            }
            None => {}
        }
    }
}
