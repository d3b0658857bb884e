//! Stage configuration.
//!
//! The configuration is a typed object graph. It changes only through [`StageConfig::apply`], one
//! [`ConfigUnit`] at a time; applying a unit twice leaves the same state as applying it once.

use thiserror::Error;

use crate::action::{Instruction, InstructionMemory};
use crate::adist::{AddressClass, AddressDistribution, AddressFieldConfig, AddressOrigin};
use crate::constants::exact::MAX_WAYS;
use crate::constants::hash::INPUT_WORDS;
use crate::constants::table::LOGICAL_TABLES;
use crate::diagnostic::{self, Diagnostic};
use crate::exact::{ExactMatchRow, WayConfig};
use crate::hash::HashMatrix;
use crate::ixbar::{ByteSource, ExactXbar, TcamXbar};
use crate::phv::{ContainerId, PhvError};
use crate::predication::PredicationRule;
use crate::sram::{RamId, SramArray, UnitRamUse};
use crate::tcam::{TcamAddress, TcamArray, TcamEntry, TcamUnitConfig};
use crate::xbar::{CrossbarConfig, Selector, SelectorKind};

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what} {index} is out of range (limit {limit})")]
    IndexOutOfRange { what: &'static str, index: usize, limit: usize },
    #[error("{what} does not fit in {bits} bits")]
    ValueTooWide { what: &'static str, bits: usize },
    #[error("byte {byte} is outside container {container}")]
    ByteOutsideContainer { container: ContainerId, byte: u8 },
    #[error("vpn shift count {vpn_shiftcount} exceeds {limit}")]
    VpnShiftOutOfRange { vpn_shiftcount: u8, limit: u8 },
    #[error("hash field [{lsb}, {lsb}+{width}) is outside the hash output")]
    HashFieldOutOfRange { lsb: usize, width: usize },
    #[error("field [{lsb}, {lsb}+{width}) is outside a 32-bit container")]
    FieldOutsideContainer { lsb: u8, width: u8 },
    #[error("container {0} is written twice by one instruction")]
    DuplicateDestination(ContainerId),
    #[error(transparent)]
    Phv(#[from] PhvError),
}

/// One configuration write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUnit {
    /// Enables or disables a logical table.
    TableEnable {
        /// Logical table.
        table: usize,
        /// Whether the table takes part in traversals.
        enabled: bool,
    },
    /// Sets a table's predication rule.
    Predication {
        /// Logical table.
        table: usize,
        /// Rule.
        rule: PredicationRule,
    },
    /// Selects the source of an exact crossbar byte.
    ExactXbarByte {
        /// Crossbar byte.
        byte: usize,
        /// Source, `None` reading zero.
        source: Option<ByteSource>,
    },
    /// Selects the source of a ternary crossbar byte.
    TcamXbarByte {
        /// Crossbar byte.
        byte: usize,
        /// Source, `None` reading zero.
        source: Option<ByteSource>,
    },
    /// Configures a TCAM unit.
    TcamUnit {
        /// Row.
        row: usize,
        /// Column.
        column: usize,
        /// Unit configuration.
        config: TcamUnitConfig,
    },
    /// Writes a TCAM word.
    TcamEntry(TcamEntry),
    /// Clears a TCAM word.
    TcamClear(TcamAddress),
    /// Replaces a hash coefficient row.
    HashRow {
        /// Hash group.
        group: usize,
        /// Output bit.
        bit: usize,
        /// Coefficients over the input bits.
        row: [u64; INPUT_WORDS],
    },
    /// Sets one hash coefficient.
    HashCoefficient {
        /// Hash group.
        group: usize,
        /// Output bit.
        bit: usize,
        /// Input bit.
        input_bit: usize,
        /// Coefficient.
        value: bool,
    },
    /// Sets a hash seed.
    HashSeed {
        /// Hash group.
        group: usize,
        /// Seed.
        seed: u64,
    },
    /// Sets a hash group's parity-group mask.
    ParityGroupMask {
        /// Hash group.
        group: usize,
        /// One bit per 64-bit input word.
        mask: u16,
    },
    /// Configures an exact-match way.
    Way {
        /// Logical table.
        table: usize,
        /// Way index.
        way: usize,
        /// Way configuration, `None` removing the way.
        config: Option<WayConfig>,
    },
    /// Sets what a unit RAM is used for.
    RamUse {
        /// RAM.
        ram: RamId,
        /// Use.
        usage: UnitRamUse,
    },
    /// Writes an exact-match row.
    ExactRow {
        /// RAM.
        ram: RamId,
        /// Word.
        row: usize,
        /// Row.
        entry: ExactMatchRow,
    },
    /// Writes an action-data word.
    ActionWord {
        /// RAM.
        ram: RamId,
        /// Word.
        row: usize,
        /// Data.
        word: u128,
    },
    /// Configures the derivation of one address class.
    AddressField {
        /// Logical table.
        table: usize,
        /// Result bus origin.
        origin: AddressOrigin,
        /// Address class.
        class: AddressClass,
        /// Derivation.
        config: AddressFieldConfig,
    },
    /// Routes one action-data bus slot.
    Crossbar {
        /// Slot width.
        kind: SelectorKind,
        /// Slot.
        slot: usize,
        /// Selector, `None` leaving the slot undriven.
        selector: Option<Selector>,
    },
    /// Writes an instruction slot.
    Instruction {
        /// Slot.
        slot: usize,
        /// Instruction, `None` emptying the slot.
        instruction: Option<Instruction>,
    },
}

/// Configuration of one logical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalTableConfig {
    /// Whether the table takes part in traversals.
    pub enabled: bool,
    /// Exact-match ways.
    pub ways: [Option<WayConfig>; MAX_WAYS],
    /// Predication rule.
    pub predication: PredicationRule,
}

impl LogicalTableConfig {
    /// Configured ways with their indices.
    pub fn configured_ways(&self) -> impl Iterator<Item = (usize, &WayConfig)> {
        self.ways.iter().enumerate().filter_map(|(i, way)| way.as_ref().map(|way| (i, way)))
    }
}

/// Configuration of a whole stage.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    pub(crate) tables: [LogicalTableConfig; LOGICAL_TABLES],
    pub(crate) exact_xbar: ExactXbar,
    pub(crate) tcam_xbar: TcamXbar,
    pub(crate) tcam: TcamArray,
    pub(crate) hash: HashMatrix,
    pub(crate) sram: SramArray,
    pub(crate) adist: AddressDistribution,
    pub(crate) crossbar: CrossbarConfig,
    pub(crate) imem: InstructionMemory,
}

fn check_table(table: usize) -> Result<(), ConfigError> {
    if table < LOGICAL_TABLES {
        Ok(())
    } else {
        Err(ConfigError::IndexOutOfRange { what: "logical table", index: table, limit: LOGICAL_TABLES })
    }
}

impl StageConfig {
    /// Applies one configuration write. Ambiguous but legal configurations are reported through `diagnostics`.
    pub fn apply(&mut self, unit: ConfigUnit, diagnostics: &mut Vec<Diagnostic>) -> Result<(), ConfigError> {
        match unit {
            ConfigUnit::TableEnable { table, enabled } => {
                check_table(table)?;
                log::info!("table {}: {}", table, if enabled { "enabled" } else { "disabled" });
                self.tables[table].enabled = enabled;
            }
            ConfigUnit::Predication { table, rule } => {
                check_table(table)?;
                log::info!("table {}: predication {:?}", table, rule);
                self.tables[table].predication = rule;
            }
            ConfigUnit::ExactXbarByte { byte, source } => self.exact_xbar.select(byte, source)?,
            ConfigUnit::TcamXbarByte { byte, source } => self.tcam_xbar.select(byte, source)?,
            ConfigUnit::TcamUnit { row, column, config } => {
                let before = self.tcam.dangling_units();
                self.tcam.configure_unit(row, column, config)?;
                log::info!("tcam unit ({}, {}): {:?}", row, column, config);
                for (row, column) in self.tcam.dangling_units() {
                    if !before.contains(&(row, column)) {
                        diagnostic::raise(diagnostics, Diagnostic::DanglingTcamUnit { row, column });
                    }
                }
            }
            ConfigUnit::TcamEntry(entry) => {
                log::debug!("{}: write {:#x}/{:#x}", entry.address, entry.value0, entry.value1);
                self.tcam.write_entry(entry)?;
            }
            ConfigUnit::TcamClear(address) => self.tcam.clear_entry(address)?,
            ConfigUnit::HashRow { group, bit, row } => self.hash.set_row(group, bit, row)?,
            ConfigUnit::HashCoefficient { group, bit, input_bit, value } => {
                self.hash.set_coefficient(group, bit, input_bit, value)?
            }
            ConfigUnit::HashSeed { group, seed } => self.hash.set_seed(group, seed)?,
            ConfigUnit::ParityGroupMask { group, mask } => self.hash.set_parity_group_mask(group, mask)?,
            ConfigUnit::Way { table, way, config } => {
                check_table(table)?;
                if way >= MAX_WAYS {
                    return Err(ConfigError::IndexOutOfRange { what: "way", index: way, limit: MAX_WAYS });
                }
                if let Some(config) = &config {
                    config.check()?;
                }
                log::info!("table {}: way {} {:?}", table, way, config);
                self.tables[table].ways[way] = config;
            }
            ConfigUnit::RamUse { ram, usage } => {
                self.sram.set_use(ram, usage)?;
                log::info!("{}: {:?}", ram, usage);
            }
            ConfigUnit::ExactRow { ram, row, entry } => {
                log::debug!("{} word {}: {:?}", ram, row, entry);
                self.sram.write_match_row(ram, row, entry)?;
            }
            ConfigUnit::ActionWord { ram, row, word } => self.sram.write_word(ram, row, word)?,
            ConfigUnit::AddressField { table, origin, class, config } => {
                let before = self.adist.config(table, origin).map(|c| c.field(class).shift_out_of_range());
                self.adist.set_field(table, origin, class, config)?;
                if config.shift_out_of_range() && before != Some(true) {
                    let shiftcount = config.shiftcount;
                    diagnostic::raise(diagnostics, Diagnostic::ShiftCountOutOfRange { table, shiftcount });
                }
            }
            ConfigUnit::Crossbar { kind, slot, selector } => self.crossbar.ctl(kind, slot, selector)?,
            ConfigUnit::Instruction { slot, instruction } => self.imem.write(slot, instruction)?,
        }
        Ok(())
    }

    /// Configuration of a logical table.
    pub fn table(&self, table: usize) -> Option<&LogicalTableConfig> { self.tables.get(table) }

    /// Exact-match input crossbar.
    pub fn exact_xbar(&self) -> &ExactXbar { &self.exact_xbar }

    /// Ternary input crossbar.
    pub fn tcam_xbar(&self) -> &TcamXbar { &self.tcam_xbar }

    /// TCAM array.
    pub fn tcam(&self) -> &TcamArray { &self.tcam }

    /// Hash matrices.
    pub fn hash(&self) -> &HashMatrix { &self.hash }

    /// SRAM array.
    pub fn sram(&self) -> &SramArray { &self.sram }

    /// Address distribution.
    pub fn adist(&self) -> &AddressDistribution { &self.adist }

    /// Action-data crossbar.
    pub fn crossbar(&self) -> &CrossbarConfig { &self.crossbar }

    /// Instruction memory.
    pub fn imem(&self) -> &InstructionMemory { &self.imem }

    /// Origin whose address configuration a table uses on a miss: TCAM if any TCAM unit drives the table.
    pub fn miss_origin(&self, table: usize) -> AddressOrigin {
        if self.tcam.serves(table) {
            AddressOrigin::Tcam
        } else {
            AddressOrigin::Exact
        }
    }
}
