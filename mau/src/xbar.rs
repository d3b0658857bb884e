//! Action-data crossbar.
//!
//! Action RAMs drive their words onto home-row buses, one 128-bit bus per `(sram row, side)`. The crossbar then
//! copies byte, half-word and word fields of those buses onto the slots of the action-data bus the VLIW
//! instructions read. Routing is total: a slot whose selector is absent or disabled reads zero.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use crate::config::ConfigError;
use crate::constants::adb::*;
use crate::constants::sram::{ROWS, WORD_BITS};
use crate::diagnostic::{self, Diagnostic};
use crate::utils::extract_u128;

/// Side of an SRAM row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// Columns 0-5.
    Left,
    /// Columns 6-11.
    Right,
}

/// A home-row bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowSide {
    /// SRAM row.
    pub row: usize,
    /// Side of the row.
    pub side: Side,
}

impl RowSide {
    fn check(self) -> Result<(), ConfigError> {
        if self.row < ROWS {
            Ok(())
        } else {
            Err(ConfigError::IndexOutOfRange { what: "home bus row", index: self.row, limit: ROWS })
        }
    }
}

impl fmt::Display for RowSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "row{}.{}", self.row, side)
    }
}

/// Width of an action-data bus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    /// 8-bit slot.
    Byte,
    /// 16-bit slot.
    Half,
    /// 32-bit slot.
    Word,
}

impl SelectorKind {
    /// Bits of a slot.
    pub const fn bits(self) -> usize {
        match self {
            Self::Byte => 8,
            Self::Half => 16,
            Self::Word => 32,
        }
    }

    /// Slots of this kind on the action-data bus.
    pub const fn slots(self) -> usize {
        match self {
            Self::Byte => BYTE_SLOTS,
            Self::Half => HALF_SLOTS,
            Self::Word => WORD_SLOTS,
        }
    }

    /// Fields of this width in one home-bus word.
    pub const fn offsets(self) -> usize { WORD_BITS / self.bits() }

    fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte slot",
            Self::Half => "half slot",
            Self::Word => "word slot",
        }
    }
}

/// Source of one action-data bus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    /// Home bus read.
    pub source: RowSide,
    /// Field of the home bus, in units of the slot width.
    pub offset: usize,
    /// Whether the slot is driven.
    pub enable: bool,
}

/// Routing of the home buses onto the action-data bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossbarConfig {
    bytes: [Option<Selector>; BYTE_SLOTS],
    halves: [Option<Selector>; HALF_SLOTS],
    words: [Option<Selector>; WORD_SLOTS],
}

impl Default for CrossbarConfig {
    fn default() -> Self { Self { bytes: [None; BYTE_SLOTS], halves: [None; HALF_SLOTS], words: [None; WORD_SLOTS] } }
}

impl CrossbarConfig {
    fn region(&self, kind: SelectorKind) -> &[Option<Selector>] {
        match kind {
            SelectorKind::Byte => &self.bytes,
            SelectorKind::Half => &self.halves,
            SelectorKind::Word => &self.words,
        }
    }

    fn region_mut(&mut self, kind: SelectorKind) -> &mut [Option<Selector>] {
        match kind {
            SelectorKind::Byte => &mut self.bytes,
            SelectorKind::Half => &mut self.halves,
            SelectorKind::Word => &mut self.words,
        }
    }

    /// Sets the selector of one slot. `None` leaves the slot undriven.
    pub fn ctl(&mut self, kind: SelectorKind, slot: usize, selector: Option<Selector>) -> Result<(), ConfigError> {
        if slot >= kind.slots() {
            return Err(ConfigError::IndexOutOfRange { what: kind.name(), index: slot, limit: kind.slots() });
        }
        if let Some(selector) = &selector {
            selector.source.check()?;
            if selector.offset >= kind.offsets() {
                return Err(ConfigError::IndexOutOfRange {
                    what: "home bus field",
                    index: selector.offset,
                    limit: kind.offsets(),
                });
            }
        }
        self.region_mut(kind)[slot] = selector;
        Ok(())
    }

    /// Routes byte `offset` of a home bus to a byte slot.
    pub fn ctl_byte(
        &mut self, row: usize, side: Side, slot: usize, offset: usize, enable: bool,
    ) -> Result<(), ConfigError> {
        self.ctl(SelectorKind::Byte, slot, Some(Selector { source: RowSide { row, side }, offset, enable }))
    }

    /// Routes half-words `offset` and `offset + 1` of a home bus to half slots `2 * pair` and `2 * pair + 1`.
    pub fn ctl_half(
        &mut self, row: usize, side: Side, pair: usize, offset: usize, enable: bool,
    ) -> Result<(), ConfigError> {
        let source = RowSide { row, side };
        self.ctl(SelectorKind::Half, 2 * pair + 1, Some(Selector { source, offset: offset + 1, enable }))?;
        self.ctl(SelectorKind::Half, 2 * pair, Some(Selector { source, offset, enable }))
    }

    /// Routes word `offset` of a home bus to a word slot.
    pub fn ctl_word(
        &mut self, row: usize, side: Side, slot: usize, offset: usize, enable: bool,
    ) -> Result<(), ConfigError> {
        self.ctl(SelectorKind::Word, slot, Some(Selector { source: RowSide { row, side }, offset, enable }))
    }

    /// Selector of a slot.
    pub fn selector(&self, kind: SelectorKind, slot: usize) -> Option<Selector> {
        self.region(kind).get(slot).copied().flatten()
    }

    /// Fills the action-data bus from the home buses.
    pub fn route(&self, buses: &HomeBuses) -> ActionDataBus {
        let mut adb = ActionDataBus::default();
        for kind in [SelectorKind::Byte, SelectorKind::Half, SelectorKind::Word] {
            for (slot, selector) in self.region(kind).iter().enumerate() {
                let value = match selector {
                    Some(Selector { source, offset, enable: true }) => {
                        extract_u128(buses.word(*source), offset * kind.bits(), kind.bits()) as u32
                    }
                    _ => 0,
                };
                adb.slots_mut(kind)[slot] = value;
            }
        }
        adb
    }
}

/// Action-data bus seen by the VLIW instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDataBus {
    bytes: [u32; BYTE_SLOTS],
    halves: [u32; HALF_SLOTS],
    words: [u32; WORD_SLOTS],
}

impl Default for ActionDataBus {
    fn default() -> Self { Self { bytes: [0; BYTE_SLOTS], halves: [0; HALF_SLOTS], words: [0; WORD_SLOTS] } }
}

impl ActionDataBus {
    fn slots_mut(&mut self, kind: SelectorKind) -> &mut [u32] {
        match kind {
            SelectorKind::Byte => &mut self.bytes,
            SelectorKind::Half => &mut self.halves,
            SelectorKind::Word => &mut self.words,
        }
    }

    /// Value of a slot. Slots outside the bus read zero.
    pub fn get(&self, kind: SelectorKind, slot: usize) -> u32 {
        let slots: &[u32] = match kind {
            SelectorKind::Byte => &self.bytes,
            SelectorKind::Half => &self.halves,
            SelectorKind::Word => &self.words,
        };
        slots.get(slot).copied().unwrap_or(0)
    }
}

/// Home-row buses of one traversal.
#[derive(Debug, Clone, Default)]
pub struct HomeBuses {
    words: LinkedHashMap<RowSide, u128>,
    drivers: LinkedHashMap<RowSide, Vec<usize>>,
}

impl HomeBuses {
    /// Drives a table's action-data word onto a bus. Words of different tables on one bus are ORed.
    pub fn drive(&mut self, bus: RowSide, table: usize, word: u128) {
        *self.words.entry(bus).or_insert(0) |= word;
        let drivers = self.drivers.entry(bus).or_insert_with(Vec::new);
        if !drivers.contains(&table) {
            drivers.push(table);
        }
    }

    /// Word on a bus. Undriven buses read zero.
    pub fn word(&self, bus: RowSide) -> u128 { self.words.get(&bus).copied().unwrap_or(0) }

    /// Raises a [`Diagnostic::HomeBusCollision`] for every bus driven by several tables.
    pub fn report_collisions(&self, diagnostics: &mut Vec<Diagnostic>) {
        for (bus, drivers) in self.drivers.iter() {
            if drivers.len() > 1 {
                let mut tables = drivers.clone();
                tables.sort_unstable();
                diagnostic::raise(diagnostics, Diagnostic::HomeBusCollision { bus: *bus, tables });
            }
        }
    }
}
