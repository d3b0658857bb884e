//! Exact-match engine.
//!
//! A logical table spreads its entries over ways. Each way hashes the exact-match crossbar with one hash group:
//! `select_bits` hash bits from `select_lsb` pick one of the way's unit RAMs, and ten hash bits from `row_lsb`
//! pick the word. The stored row hits iff it is valid, its VPN equals the VPN of the RAM it was read from, and
//! every compared nibble of the key agrees.

use arrayvec::ArrayVec;

use crate::config::ConfigError;
use crate::constants::exact::*;
use crate::constants::hash::{GROUPS as HASH_GROUPS, OUTPUT_BITS as HASH_BITS};
use crate::constants::ixbar::EXACT_BYTES;
use crate::constants::sram::ROW_ADDRESS_BITS;
use crate::diagnostic::{self, Diagnostic};
use crate::hash::{hash_bits, HashInput, HashMatrix};
use crate::sram::{RamId, SramArray, UnitRamUse};

/// One exact-match row as stored in a unit RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactMatchRow {
    /// Whether the row holds an entry.
    pub valid: bool,
    /// VPN the row belongs to.
    pub vpn: u8,
    /// Stored key pattern.
    pub key: [u8; KEY_BYTES],
    /// Key bytes that are compared. Bit `i` is byte `i`.
    pub byte_mask: u16,
    /// Nibbles that are compared inside the compared bytes. Bit `2i` is the low nibble of byte `i`.
    pub nibble_enable: u32,
    /// Version tag, stored and read back as written.
    pub version: u8,
}

const FULL_BYTE_MASK: u16 = ((1u32 << KEY_BYTES) - 1) as u16;
const FULL_NIBBLE_MASK: u32 = ((1u64 << (2 * KEY_BYTES)) - 1) as u32;

impl ExactMatchRow {
    /// Creates a valid row comparing the first `len` key bytes.
    pub fn new(vpn: u8, key: &[u8]) -> Self {
        let len = key.len().min(KEY_BYTES);
        let mut stored = [0; KEY_BYTES];
        stored[..len].copy_from_slice(&key[..len]);
        Self {
            valid: true,
            vpn,
            key: stored,
            byte_mask: ((1u32 << len) - 1) as u16,
            nibble_enable: FULL_NIBBLE_MASK,
            version: 0,
        }
    }

    /// Compared bits of byte `i`.
    fn care(&self, i: usize) -> u8 {
        if self.byte_mask & (1 << i) == 0 {
            return 0;
        }
        let nibbles = (self.nibble_enable >> (2 * i)) & 0b11;
        (if nibbles & 0b01 != 0 { 0x0f } else { 0 }) | (if nibbles & 0b10 != 0 { 0xf0 } else { 0 })
    }

    /// Whether the row's pattern agrees with a key on every compared nibble.
    pub fn matches_key(&self, key: &[u8; KEY_BYTES]) -> bool {
        (0..KEY_BYTES).all(|i| (self.key[i] ^ key[i]) & self.care(i) == 0)
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if usize::from(self.vpn) >> VPN_BITS != 0 {
            return Err(ConfigError::ValueTooWide { what: "vpn", bits: VPN_BITS });
        }
        if self.byte_mask & !FULL_BYTE_MASK != 0 {
            return Err(ConfigError::ValueTooWide { what: "byte mask", bits: KEY_BYTES });
        }
        if self.nibble_enable & !FULL_NIBBLE_MASK != 0 {
            return Err(ConfigError::ValueTooWide { what: "nibble enable", bits: 2 * KEY_BYTES });
        }
        if usize::from(self.version) >> VERSION_BITS != 0 {
            return Err(ConfigError::ValueTooWide { what: "exact version", bits: VERSION_BITS });
        }
        Ok(())
    }
}

/// One way of an exact-match table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WayConfig {
    /// Hash group the way uses.
    pub hash_group: usize,
    /// First hash bit of the ten-bit row index.
    pub row_lsb: usize,
    /// First hash bit of the RAM select.
    pub select_lsb: usize,
    /// Width of the RAM select.
    pub select_bits: usize,
    /// RAMs the select picks between.
    pub rams: ArrayVec<RamId, MAX_WAY_RAMS>,
    /// Exact crossbar bytes forming the compared key, key byte 0 first.
    pub key_bytes: ArrayVec<usize, KEY_BYTES>,
}

impl WayConfig {
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if self.hash_group >= HASH_GROUPS {
            return Err(ConfigError::IndexOutOfRange {
                what: "hash group",
                index: self.hash_group,
                limit: HASH_GROUPS,
            });
        }
        if self.row_lsb + ROW_ADDRESS_BITS > HASH_BITS {
            return Err(ConfigError::HashFieldOutOfRange { lsb: self.row_lsb, width: ROW_ADDRESS_BITS });
        }
        if self.select_bits > MAX_SELECT_BITS || self.select_lsb + self.select_bits > HASH_BITS {
            return Err(ConfigError::HashFieldOutOfRange { lsb: self.select_lsb, width: self.select_bits });
        }
        for ram in &self.rams {
            ram.check()?;
        }
        for byte in &self.key_bytes {
            if *byte >= EXACT_BYTES {
                return Err(ConfigError::IndexOutOfRange {
                    what: "exact crossbar byte",
                    index: *byte,
                    limit: EXACT_BYTES,
                });
            }
        }
        Ok(())
    }

    /// Compared key gathered from the exact crossbar.
    pub fn key(&self, xbar: &[u8; EXACT_BYTES]) -> [u8; KEY_BYTES] {
        let mut key = [0; KEY_BYTES];
        for (k, byte) in key.iter_mut().zip(self.key_bytes.iter()) {
            *k = xbar[*byte];
        }
        key
    }

    /// RAM and word the way reads for a hash value. `None` when the select names no RAM.
    pub fn locate(&self, hash: u64) -> Option<(RamId, usize)> {
        let select = hash_bits(hash, self.select_lsb, self.select_bits) as usize;
        let ram = *self.rams.get(select)?;
        let row = hash_bits(hash, self.row_lsb, ROW_ADDRESS_BITS) as usize;
        Some((ram, row))
    }
}

/// A way that hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactHit {
    /// Way index.
    pub way: usize,
    /// RAM read.
    pub ram: RamId,
    /// Word read.
    pub row: usize,
    /// VPN of the hit.
    pub vpn: u8,
    /// Version tag of the stored row.
    pub version: u8,
}

impl ExactHit {
    /// Raw match address handed to address distribution: `vpn | row`.
    pub fn raw(&self) -> u32 { (u32::from(self.vpn) << ROW_ADDRESS_BITS) | self.row as u32 }
}

/// Reads the row a way addresses and compares it with the key.
///
/// A match RAM owned by another table reads as a miss and raises [`Diagnostic::ForeignRam`].
#[allow(clippy::too_many_arguments)]
pub fn read_way(
    table: usize, way_index: usize, way: &WayConfig, sram: &SramArray, hash: &HashMatrix, input: &HashInput,
    xbar: &[u8; EXACT_BYTES], diagnostics: &mut Vec<Diagnostic>,
) -> Option<ExactHit> {
    let (ram, row) = way.locate(hash.hash(way.hash_group, input)?)?;
    let vpn = match sram.usage(ram) {
        UnitRamUse::Match { table: owner, vpn } if owner == table => vpn,
        UnitRamUse::Match { table: owner, .. } => {
            diagnostic::raise(diagnostics, Diagnostic::ForeignRam { table, way: way_index, ram, owner });
            return None;
        }
        _ => return None,
    };
    let stored = sram.match_row(ram, row)?;
    if stored.valid && stored.vpn == vpn && stored.matches_key(&way.key(xbar)) {
        Some(ExactHit { way: way_index, ram, row, vpn, version: stored.version })
    } else {
        None
    }
}

/// Looks the key up in every way of a table. Hits are in way order.
pub fn lookup<'a, I>(
    table: usize, ways: I, sram: &SramArray, hash: &HashMatrix, xbar: &[u8; EXACT_BYTES],
    diagnostics: &mut Vec<Diagnostic>,
) -> ArrayVec<ExactHit, MAX_WAYS>
where I: IntoIterator<Item = (usize, &'a WayConfig)> {
    let input = HashInput::from_bytes(xbar);
    ways.into_iter()
        .filter_map(|(i, way)| read_way(table, i, way, sram, hash, &input, xbar, diagnostics))
        .take(MAX_WAYS)
        .collect()
}
