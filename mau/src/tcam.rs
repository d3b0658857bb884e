//! Ternary matcher.
//!
//! Each TCAM word stores two bit vectors. Bit `k` of `value0` set means "matches when key bit `k` is 0",
//! bit `k` of `value1` set means "matches when key bit `k` is 1". So `(1, 1)` is don't-care, `(1, 0)` and
//! `(0, 1)` are the literals 0 and 1, and `(0, 0)` never matches.
//!
//! Priority among hits of one logical table is the lexicographic order of `(row, column, index)`: the lowest
//! row wins, then the lowest column inside a row, then the lowest word inside a unit.

use std::fmt;

use itertools::iproduct;

use crate::config::ConfigError;
use crate::constants::ixbar::{TCAM_BYTES, TCAM_KEY_GROUPS};
use crate::constants::tcam::*;
use crate::constants::table::LOGICAL_TABLES;
use crate::ixbar::tcam_search_word;

/// Address of a TCAM word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TcamAddress {
    /// Row of the unit.
    pub row: usize,
    /// Column of the unit.
    pub column: usize,
    /// Word inside the unit.
    pub index: usize,
}

impl TcamAddress {
    /// Raw match address handed to address distribution: `row | column | index`.
    pub fn raw(self) -> u32 {
        ((self.row << (COLUMN_BITS + INDEX_BITS)) | (self.column << INDEX_BITS) | self.index) as u32
    }

    /// Inverse of [`TcamAddress::raw`].
    pub fn from_raw(raw: u32) -> Self {
        let raw = raw as usize;
        Self {
            row: raw >> (COLUMN_BITS + INDEX_BITS),
            column: (raw >> INDEX_BITS) & ((1 << COLUMN_BITS) - 1),
            index: raw & ((1 << INDEX_BITS) - 1),
        }
    }

    fn check(self) -> Result<(), ConfigError> {
        if self.row >= ROWS {
            return Err(ConfigError::IndexOutOfRange { what: "tcam row", index: self.row, limit: ROWS });
        }
        if self.column >= COLUMNS {
            return Err(ConfigError::IndexOutOfRange { what: "tcam column", index: self.column, limit: COLUMNS });
        }
        if self.index >= DEPTH {
            return Err(ConfigError::IndexOutOfRange { what: "tcam word", index: self.index, limit: DEPTH });
        }
        Ok(())
    }
}

impl fmt::Display for TcamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcam[{}][{}][{}]", self.row, self.column, self.index)
    }
}

/// One TCAM word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcamEntry {
    /// Where the word lives.
    pub address: TcamAddress,
    /// Bits matching a key bit 0.
    pub value0: u64,
    /// Bits matching a key bit 1.
    pub value1: u64,
    /// Version tag, stored and read back as written.
    pub version: u8,
    /// Whether the word takes part in searches.
    pub enabled: bool,
}

impl TcamEntry {
    /// Creates an entry matching `value` on the bits set in `care`, don't-care elsewhere.
    pub fn ternary(address: TcamAddress, value: u64, care: u64) -> Self {
        let value = value & WORD_MASK;
        let care = care & WORD_MASK;
        Self {
            address,
            value0: (!value & care) | (!care & WORD_MASK),
            value1: (value & care) | (!care & WORD_MASK),
            version: 0,
            enabled: true,
        }
    }

    /// Creates an entry matching exactly `value`.
    pub fn literal(address: TcamAddress, value: u64) -> Self { Self::ternary(address, value, WORD_MASK) }

    /// Whether the entry matches a search word.
    pub fn matches(&self, key: u64) -> bool {
        let key = key & WORD_MASK;
        let mismatch = (key & !self.value1) | (!key & !self.value0);
        self.enabled && (mismatch & WORD_MASK) == 0
    }

    fn check(&self) -> Result<(), ConfigError> {
        self.address.check()?;
        if ((self.value0 | self.value1) & !WORD_MASK) != 0 {
            return Err(ConfigError::ValueTooWide { what: "tcam word", bits: WORD_BITS });
        }
        if self.version >> VERSION_BITS != 0 {
            return Err(ConfigError::ValueTooWide { what: "tcam version", bits: VERSION_BITS });
        }
        Ok(())
    }
}

/// Configuration of one TCAM unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcamUnitConfig {
    /// Logical table searching the unit. `None` leaves the unit idle.
    pub logical_table: Option<usize>,
    /// Key group of the ternary crossbar the unit searches.
    pub key_group: usize,
    /// ANDs the unit's hits with the unit one row above, same column, same word.
    pub chain_in: bool,
    /// The unit's hits are results of its logical table.
    pub output_enable: bool,
}

impl TcamUnitConfig {
    fn check(&self) -> Result<(), ConfigError> {
        if let Some(table) = self.logical_table {
            if table >= LOGICAL_TABLES {
                return Err(ConfigError::IndexOutOfRange { what: "logical table", index: table, limit: LOGICAL_TABLES });
            }
        }
        if self.key_group >= TCAM_KEY_GROUPS {
            return Err(ConfigError::IndexOutOfRange {
                what: "tcam key group",
                index: self.key_group,
                limit: TCAM_KEY_GROUPS,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Unit {
    config: TcamUnitConfig,
    words: Vec<Option<TcamEntry>>,
}

impl Default for Unit {
    fn default() -> Self { Self { config: TcamUnitConfig::default(), words: vec![None; DEPTH] } }
}

/// The TCAM array of a stage.
#[derive(Debug, Clone)]
pub struct TcamArray {
    units: Vec<Unit>,
}

impl Default for TcamArray {
    fn default() -> Self { Self { units: vec![Unit::default(); ROWS * COLUMNS] } }
}

impl TcamArray {
    fn unit(&self, row: usize, column: usize) -> &Unit { &self.units[row * COLUMNS + column] }

    fn unit_mut(&mut self, row: usize, column: usize) -> &mut Unit { &mut self.units[row * COLUMNS + column] }

    /// Writes a word. A second write to the same address replaces the first.
    pub fn write_entry(&mut self, entry: TcamEntry) -> Result<(), ConfigError> {
        entry.check()?;
        let TcamAddress { row, column, index } = entry.address;
        self.unit_mut(row, column).words[index] = Some(entry);
        Ok(())
    }

    /// Clears a word.
    pub fn clear_entry(&mut self, address: TcamAddress) -> Result<(), ConfigError> {
        address.check()?;
        self.unit_mut(address.row, address.column).words[address.index] = None;
        Ok(())
    }

    /// Word at an address.
    pub fn entry(&self, address: TcamAddress) -> Option<&TcamEntry> {
        address.check().ok()?;
        self.unit(address.row, address.column).words[address.index].as_ref()
    }

    /// Configures a unit.
    pub fn configure_unit(&mut self, row: usize, column: usize, config: TcamUnitConfig) -> Result<(), ConfigError> {
        TcamAddress { row, column, index: 0 }.check()?;
        config.check()?;
        self.unit_mut(row, column).config = config;
        Ok(())
    }

    /// Configuration of a unit.
    pub fn unit_config(&self, row: usize, column: usize) -> Option<TcamUnitConfig> {
        TcamAddress { row, column, index: 0 }.check().ok()?;
        Some(self.unit(row, column).config)
    }

    /// Whether any unit drives results of the table.
    pub fn serves(&self, table: usize) -> bool {
        self.units.iter().any(|u| u.config.logical_table == Some(table) && u.config.output_enable)
    }

    /// Units claiming a table that neither drive a result nor chain into a unit of the same table that does.
    pub fn dangling_units(&self) -> Vec<(usize, usize)> {
        iproduct!(0..ROWS, 0..COLUMNS)
            .filter(|&(row, column)| {
                let config = self.unit(row, column).config;
                config.logical_table.is_some() && !self.reaches_output(row, column)
            })
            .collect()
    }

    fn reaches_output(&self, row: usize, column: usize) -> bool {
        let config = self.unit(row, column).config;
        if config.output_enable {
            return true;
        }
        if row + 1 >= ROWS {
            return false;
        }
        let below = self.unit(row + 1, column).config;
        below.chain_in && below.logical_table == config.logical_table && self.reaches_output(row + 1, column)
    }

    fn word_hit(&self, row: usize, column: usize, index: usize, key: &[u8; TCAM_BYTES]) -> bool {
        let unit = self.unit(row, column);
        let own = unit.words[index]
            .as_ref()
            .map(|entry| entry.matches(tcam_search_word(key, unit.config.key_group)))
            .unwrap_or(false);
        if !own {
            return false;
        }
        if unit.config.chain_in {
            row > 0
                && self.unit(row - 1, column).config.logical_table == unit.config.logical_table
                && self.word_hit(row - 1, column, index, key)
        } else {
            true
        }
    }

    /// All hits of a logical table, highest priority first.
    pub fn hits<'a>(&'a self, table: usize, key: &'a [u8; TCAM_BYTES]) -> impl Iterator<Item = TcamAddress> + 'a {
        iproduct!(0..ROWS, 0..COLUMNS)
            .filter(move |&(row, column)| {
                let config = self.unit(row, column).config;
                config.logical_table == Some(table) && config.output_enable
            })
            .flat_map(move |(row, column)| {
                (0..DEPTH)
                    .filter(move |&index| self.word_hit(row, column, index, key))
                    .map(move |index| TcamAddress { row, column, index })
            })
    }

    /// Highest-priority hit of a logical table.
    pub fn lookup(&self, table: usize, key: &[u8; TCAM_BYTES]) -> Option<TcamAddress> { self.hits(table, key).next() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with_word(group: usize, word: u64) -> [u8; TCAM_BYTES] {
        let mut key = [0; TCAM_BYTES];
        for i in 0..6 {
            key[group * 6 + i] = (word >> (8 * i)) as u8;
        }
        key
    }

    fn owned(table: usize, key_group: usize) -> TcamUnitConfig {
        TcamUnitConfig { logical_table: Some(table), key_group, chain_in: false, output_enable: true }
    }

    #[test]
    fn ternary_encoding() {
        let at = TcamAddress { row: 0, column: 0, index: 0 };
        let entry = TcamEntry::ternary(at, 0b1010, 0b1110);
        assert!(entry.matches(0b1010));
        assert!(entry.matches(0b1011));
        assert!(!entry.matches(0b1000));
        assert!(entry.matches(0b1_0000_1010));

        let never = TcamEntry { value0: 0, value1: 0, ..entry };
        assert!(!never.matches(0));
        let disabled = TcamEntry { enabled: false, ..entry };
        assert!(!disabled.matches(0b1010));
    }

    #[test]
    fn raw_address_roundtrip() {
        let a = TcamAddress { row: 11, column: 1, index: 511 };
        assert_eq!(TcamAddress::from_raw(a.raw()), a);
        assert_eq!(TcamAddress { row: 1, column: 0, index: 3 }.raw(), (1 << 10) | 3);
    }

    #[test]
    fn lower_row_and_column_win() {
        let mut tcam = TcamArray::default();
        for (row, column) in [(0, 1), (3, 0), (1, 0)] {
            tcam.configure_unit(row, column, owned(2, 0)).unwrap();
            let at = TcamAddress { row, column, index: 7 };
            tcam.write_entry(TcamEntry::ternary(at, 0, 0)).unwrap();
        }
        let key = key_with_word(0, 0x1234);
        let hits = tcam.hits(2, &key).collect::<Vec<_>>();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], TcamAddress { row: 0, column: 1, index: 7 });
        assert_eq!(hits[1], TcamAddress { row: 1, column: 0, index: 7 });
        assert_eq!(tcam.lookup(2, &key), Some(hits[0]));
        assert_eq!(tcam.lookup(3, &key), None);
    }

    #[test]
    fn lower_index_wins_inside_a_unit() {
        let mut tcam = TcamArray::default();
        tcam.configure_unit(4, 0, owned(0, 3)).unwrap();
        tcam.write_entry(TcamEntry::literal(TcamAddress { row: 4, column: 0, index: 9 }, 0x55)).unwrap();
        tcam.write_entry(TcamEntry::ternary(TcamAddress { row: 4, column: 0, index: 2 }, 0x50, 0xf0)).unwrap();
        let key = key_with_word(3, 0x55);
        assert_eq!(tcam.lookup(0, &key), Some(TcamAddress { row: 4, column: 0, index: 2 }));
    }

    #[test]
    fn chained_units_match_wide_keys() {
        let mut tcam = TcamArray::default();
        tcam.configure_unit(0, 0, TcamUnitConfig { output_enable: false, ..owned(1, 0) }).unwrap();
        tcam.configure_unit(1, 0, TcamUnitConfig { chain_in: true, ..owned(1, 1) }).unwrap();
        tcam.write_entry(TcamEntry::literal(TcamAddress { row: 0, column: 0, index: 5 }, 0xaaa)).unwrap();
        tcam.write_entry(TcamEntry::literal(TcamAddress { row: 1, column: 0, index: 5 }, 0xbbb)).unwrap();

        let mut key = key_with_word(0, 0xaaa);
        key[6..12].copy_from_slice(&key_with_word(1, 0xbbb)[6..12]);
        assert_eq!(tcam.lookup(1, &key), Some(TcamAddress { row: 1, column: 0, index: 5 }));

        key[0] ^= 1;
        assert_eq!(tcam.lookup(1, &key), None);
        assert!(tcam.dangling_units().is_empty());
    }

    #[test]
    fn dangling_units_are_reported() {
        let mut tcam = TcamArray::default();
        tcam.configure_unit(2, 1, TcamUnitConfig { output_enable: false, ..owned(5, 0) }).unwrap();
        assert_eq!(tcam.dangling_units(), vec![(2, 1)]);
        assert_eq!(tcam.unit_config(2, 1).and_then(|c| c.logical_table), Some(5));
        assert_eq!(tcam.unit_config(ROWS, 0), None);
        assert_eq!(tcam.unit_config(0, COLUMNS), None);
    }

    #[test]
    fn writes_are_checked() {
        let mut tcam = TcamArray::default();
        let at = TcamAddress { row: 12, column: 0, index: 0 };
        assert!(tcam.write_entry(TcamEntry::literal(at, 0)).is_err());
        let at = TcamAddress { row: 0, column: 0, index: 0 };
        let wide = TcamEntry { value0: 1 << 44, ..TcamEntry::literal(at, 0) };
        assert!(tcam.write_entry(wide).is_err());
        let versioned = TcamEntry { version: 4, ..TcamEntry::literal(at, 0) };
        assert!(tcam.write_entry(versioned).is_err());
        assert!(tcam.configure_unit(0, 0, owned(16, 0)).is_err());
    }
}
