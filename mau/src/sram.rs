//! SRAM array: unit RAMs holding exact-match rows or action data.

use std::fmt;

use crate::config::ConfigError;
use crate::constants::exact::VPN_BITS;
use crate::constants::sram::*;
use crate::exact::ExactMatchRow;
use crate::xbar::{RowSide, Side};

/// Position of a unit RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RamId {
    /// Row.
    pub row: usize,
    /// Column.
    pub column: usize,
}

impl RamId {
    /// Creates a position, checking it lies in the array.
    pub fn new(row: usize, column: usize) -> Result<Self, ConfigError> {
        let id = Self { row, column };
        id.check()?;
        Ok(id)
    }

    pub(crate) fn check(self) -> Result<(), ConfigError> {
        if self.row >= ROWS {
            return Err(ConfigError::IndexOutOfRange { what: "sram row", index: self.row, limit: ROWS });
        }
        if self.column >= COLUMNS {
            return Err(ConfigError::IndexOutOfRange { what: "sram column", index: self.column, limit: COLUMNS });
        }
        Ok(())
    }

    /// Home-row bus the RAM drives its action data onto.
    pub fn home_bus(self) -> RowSide {
        let side = if self.column < LEFT_COLUMNS { Side::Left } else { Side::Right };
        RowSide { row: self.row, side }
    }

    fn flat(self) -> usize { self.row * COLUMNS + self.column }
}

impl fmt::Display for RamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ram[{}][{}]", self.row, self.column) }
}

/// What a unit RAM is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRamUse {
    /// Not used.
    Unused,
    /// Exact-match rows of `table`. Stored rows hit only if their VPN is `vpn`.
    Match {
        /// Logical table.
        table: usize,
        /// VPN of the RAM.
        vpn: u8,
    },
    /// Action data of `table`, holding physical action-data VPN `vpn`.
    ActionData {
        /// Logical table.
        table: usize,
        /// Physical VPN of the RAM.
        vpn: u8,
    },
}

impl Default for UnitRamUse {
    fn default() -> Self { Self::Unused }
}

impl UnitRamUse {
    fn check(self) -> Result<(), ConfigError> {
        let (table, vpn) = match self {
            Self::Unused => return Ok(()),
            Self::Match { table, vpn } | Self::ActionData { table, vpn } => (table, vpn),
        };
        if table >= crate::constants::table::LOGICAL_TABLES {
            return Err(ConfigError::IndexOutOfRange {
                what: "logical table",
                index: table,
                limit: crate::constants::table::LOGICAL_TABLES,
            });
        }
        if usize::from(vpn) >> VPN_BITS != 0 {
            return Err(ConfigError::ValueTooWide { what: "vpn", bits: VPN_BITS });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct UnitRam {
    usage: UnitRamUse,
    match_rows: Vec<Option<ExactMatchRow>>,
    words: Vec<u128>,
}

/// The SRAM array of a stage.
#[derive(Debug, Clone)]
pub struct SramArray {
    rams: Vec<UnitRam>,
}

impl Default for SramArray {
    fn default() -> Self { Self { rams: vec![UnitRam::default(); ROWS * COLUMNS] } }
}

fn check_row(row: usize) -> Result<(), ConfigError> {
    if row < DEPTH {
        Ok(())
    } else {
        Err(ConfigError::IndexOutOfRange { what: "sram word", index: row, limit: DEPTH })
    }
}

impl SramArray {
    fn unit(&self, ram: RamId) -> Option<&UnitRam> {
        ram.check().ok()?;
        self.rams.get(ram.flat())
    }

    /// Sets what a RAM is used for. Stored contents are kept.
    pub fn set_use(&mut self, ram: RamId, usage: UnitRamUse) -> Result<(), ConfigError> {
        ram.check()?;
        usage.check()?;
        self.rams[ram.flat()].usage = usage;
        Ok(())
    }

    /// What a RAM is used for.
    pub fn usage(&self, ram: RamId) -> UnitRamUse { self.unit(ram).map(|r| r.usage).unwrap_or_default() }

    /// RAMs used by a table, in `(row, column)` order.
    pub fn rams_of(&self, table: usize) -> impl Iterator<Item = (RamId, UnitRamUse)> + '_ {
        self.rams.iter().enumerate().filter_map(move |(flat, ram)| match ram.usage {
            UnitRamUse::Match { table: t, .. } | UnitRamUse::ActionData { table: t, .. } if t == table => {
                Some((RamId { row: flat / COLUMNS, column: flat % COLUMNS }, ram.usage))
            }
            _ => None,
        })
    }

    /// Writes an exact-match row.
    pub fn write_match_row(&mut self, ram: RamId, row: usize, entry: ExactMatchRow) -> Result<(), ConfigError> {
        ram.check()?;
        check_row(row)?;
        entry.check()?;
        let rows = &mut self.rams[ram.flat()].match_rows;
        if rows.is_empty() {
            rows.resize(DEPTH, None);
        }
        rows[row] = Some(entry);
        Ok(())
    }

    /// Exact-match row at a word.
    pub fn match_row(&self, ram: RamId, row: usize) -> Option<&ExactMatchRow> {
        self.unit(ram)?.match_rows.get(row)?.as_ref()
    }

    /// Writes an action-data word.
    pub fn write_word(&mut self, ram: RamId, row: usize, word: u128) -> Result<(), ConfigError> {
        ram.check()?;
        check_row(row)?;
        let words = &mut self.rams[ram.flat()].words;
        if words.is_empty() {
            words.resize(DEPTH, 0);
        }
        words[row] = word;
        Ok(())
    }

    /// Action-data word. Never-written words read zero.
    pub fn word(&self, ram: RamId, row: usize) -> u128 {
        self.unit(ram).and_then(|r| r.words.get(row)).copied().unwrap_or(0)
    }
}
