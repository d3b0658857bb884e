//! Address map.
//!
//! Addresses are 32 bits with the region in bits 31..24. The remaining bits index into the region:
//!
//! | region | kind      | index bits                                                   |
//! |--------|-----------|--------------------------------------------------------------|
//! | `0x01` | register  | table 11..8, register 7..0 (0 enable, 1 predication)         |
//! | `0x02` | register  | exact crossbar byte 7..0                                     |
//! | `0x03` | register  | ternary crossbar byte 7..0                                   |
//! | `0x04` | register  | TCAM row 7..4, column 3..0                                   |
//! | `0x05` | register  | hash group 14..12, register 11..0 (see below)                |
//! | `0x06` | register  | table 11..8, way 7..4, register 3..0 (see below)             |
//! | `0x07` | register  | RAM row 11..8, column 7..4, register 3..0 (0 use, 1 nibbles) |
//! | `0x08` | register  | table 11..8, origin 7, class 6..4, word 1..0                 |
//! | `0x09` | register  | selector kind 9..8, slot 7..0                                |
//! | `0x10` | table row | TCAM row 13..10, column 9, word 8..0                         |
//! | `0x11` | table row | RAM row 16..14, column 13..10, word 9..0                     |
//! | `0x12` | table row | instruction slot 13..8, operation 7..0                       |
//!
//! Hash registers: `32 * bit + chunk` for the coefficient row of output `bit` (chunk `c` holding input bits
//! `32c..32c+32`), `0x700`/`0x701` for the low/high seed halves, `0x702` for the parity-group mask.
//!
//! Way registers: 0 for [`WayCtl`](crate::layout::WayCtl), 1 and 2 for the RAM list, 3 to 5 for the key bytes.

use mau::constants::exact::{KEY_BYTES, MAX_WAYS, MAX_WAY_RAMS};
use mau::constants::hash::{GROUPS as HASH_GROUPS, INPUT_WORDS, OUTPUT_BITS};
use mau::constants::imem::SLOTS;
use mau::constants::ixbar::{EXACT_BYTES, TCAM_BYTES};
use mau::constants::table::LOGICAL_TABLES;
use mau::constants::{sram, tcam};
use mau::{AddressClass, AddressOrigin, SelectorKind, TcamAddress};

use crate::adapter::AdapterError;

/// Region numbers.
#[allow(missing_docs)]
pub mod region {
    pub const TABLE: u32 = 0x01;
    pub const EXACT_XBAR: u32 = 0x02;
    pub const TCAM_XBAR: u32 = 0x03;
    pub const TCAM_UNIT: u32 = 0x04;
    pub const HASH: u32 = 0x05;
    pub const WAY: u32 = 0x06;
    pub const RAM: u32 = 0x07;
    pub const ADIST: u32 = 0x08;
    pub const CROSSBAR: u32 = 0x09;
    pub const TCAM_WORD: u32 = 0x10;
    pub const SRAM_WORD: u32 = 0x11;
    pub const OPERATION: u32 = 0x12;
}

/// Hash register chunks per coefficient row.
pub const HASH_CHUNKS: usize = INPUT_WORDS * 2;
/// Low seed half.
const HASH_SEED_LO: usize = 0x700;
/// High seed half.
const HASH_SEED_HI: usize = 0x701;
const HASH_PARITY: usize = 0x702;
/// RAM list entries per way register.
pub const SLOTS_PER_REGISTER: usize = 4;
/// Registers holding a way's RAM list.
pub const WAY_RAM_REGISTERS: usize = MAX_WAY_RAMS / SLOTS_PER_REGISTER;
/// Registers holding a way's key bytes.
pub const WAY_KEY_REGISTERS: usize = KEY_BYTES / SLOTS_PER_REGISTER;
/// Operations per instruction slot.
pub const OPS_PER_SLOT: usize = 32;

static_assertions::const_assert!(HASH_CHUNKS * OUTPUT_BITS <= HASH_SEED_LO);
static_assertions::const_assert_eq!(MAX_WAY_RAMS % SLOTS_PER_REGISTER, 0);
static_assertions::const_assert_eq!(KEY_BYTES % SLOTS_PER_REGISTER, 0);
static_assertions::const_assert!(OPS_PER_SLOT <= 256);

/// One of the four registers of an address field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWord {
    Shift,
    Mask,
    Default,
    Miss,
}

impl AddressWord {
    /// All words, in register order.
    pub const ALL: [Self; 4] = [Self::Shift, Self::Mask, Self::Default, Self::Miss];

    /// Position in [`AddressWord::ALL`].
    pub fn index(self) -> usize { self as usize }
}

/// A decoded control register address.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAddress {
    TableEnable { table: usize },
    Predication { table: usize },
    ExactXbar { byte: usize },
    TcamXbar { byte: usize },
    TcamUnit { row: usize, column: usize },
    HashRow { group: usize, bit: usize, chunk: usize },
    HashSeed { group: usize, high: bool },
    ParityGroupMask { group: usize },
    WayCtl { table: usize, way: usize },
    WayRams { table: usize, way: usize, part: usize },
    WayKeyBytes { table: usize, way: usize, part: usize },
    RamUse { row: usize, column: usize },
    NibbleEnable { row: usize, column: usize },
    AddressField { table: usize, origin: AddressOrigin, class: AddressClass, word: AddressWord },
    Crossbar { kind: SelectorKind, slot: usize },
}

/// A decoded table-row address.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAddress {
    TcamWord(TcamAddress),
    SramWord { row: usize, column: usize, word: usize },
    Operation { slot: usize, op: usize },
}

const KINDS: [SelectorKind; 3] = [SelectorKind::Byte, SelectorKind::Half, SelectorKind::Word];
const ORIGINS: [AddressOrigin; 2] = [AddressOrigin::Exact, AddressOrigin::Tcam];

fn bits(address: u32, lsb: u32, width: u32) -> usize { ((address >> lsb) & ((1 << width) - 1)) as usize }

fn index(address: u32, what: &'static str, lsb: u32, width: u32, limit: usize) -> Result<usize, AdapterError> {
    let index = bits(address, lsb, width);
    if index < limit {
        Ok(index)
    } else {
        Err(AdapterError::IndexOutOfRange { address, what, index, limit })
    }
}

fn at(region: u32, fields: &[(usize, u32)]) -> u32 {
    fields.iter().fold(region << 24, |address, (value, lsb)| address | ((*value as u32) << lsb))
}

fn kind_index(kind: SelectorKind) -> usize {
    match kind {
        SelectorKind::Byte => 0,
        SelectorKind::Half => 1,
        SelectorKind::Word => 2,
    }
}

fn origin_index(origin: AddressOrigin) -> usize {
    match origin {
        AddressOrigin::Exact => 0,
        AddressOrigin::Tcam => 1,
    }
}

/// Rejects addresses with bits set outside the decoded fields.
fn canonical<T>(address: u32, decoded: T, encode: impl Fn(&T) -> u32) -> Result<T, AdapterError> {
    if encode(&decoded) == address {
        Ok(decoded)
    } else {
        Err(AdapterError::UnknownAddress(address))
    }
}

impl RegisterAddress {
    /// Decodes a control register address.
    pub fn decode(address: u32) -> Result<Self, AdapterError> {
        let decoded = match address >> 24 {
            region::TABLE => {
                let table = index(address, "logical table", 8, 4, LOGICAL_TABLES)?;
                match bits(address, 0, 8) {
                    0 => Self::TableEnable { table },
                    1 => Self::Predication { table },
                    _ => return Err(AdapterError::UnknownAddress(address)),
                }
            }
            region::EXACT_XBAR => Self::ExactXbar { byte: index(address, "exact crossbar byte", 0, 8, EXACT_BYTES)? },
            region::TCAM_XBAR => Self::TcamXbar { byte: index(address, "ternary crossbar byte", 0, 8, TCAM_BYTES)? },
            region::TCAM_UNIT => Self::TcamUnit {
                row: index(address, "tcam row", 4, 4, tcam::ROWS)?,
                column: index(address, "tcam column", 0, 4, tcam::COLUMNS)?,
            },
            region::HASH => {
                let group = index(address, "hash group", 12, 3, HASH_GROUPS)?;
                match bits(address, 0, 12) {
                    HASH_SEED_LO => Self::HashSeed { group, high: false },
                    HASH_SEED_HI => Self::HashSeed { group, high: true },
                    HASH_PARITY => Self::ParityGroupMask { group },
                    reg if reg < HASH_CHUNKS * OUTPUT_BITS => {
                        Self::HashRow { group, bit: reg / HASH_CHUNKS, chunk: reg % HASH_CHUNKS }
                    }
                    _ => return Err(AdapterError::UnknownAddress(address)),
                }
            }
            region::WAY => {
                let table = index(address, "logical table", 8, 4, LOGICAL_TABLES)?;
                let way = index(address, "way", 4, 4, MAX_WAYS)?;
                match bits(address, 0, 4) {
                    0 => Self::WayCtl { table, way },
                    reg if reg <= WAY_RAM_REGISTERS => Self::WayRams { table, way, part: reg - 1 },
                    reg if reg <= WAY_RAM_REGISTERS + WAY_KEY_REGISTERS => {
                        Self::WayKeyBytes { table, way, part: reg - 1 - WAY_RAM_REGISTERS }
                    }
                    _ => return Err(AdapterError::UnknownAddress(address)),
                }
            }
            region::RAM => {
                let row = index(address, "ram row", 8, 4, sram::ROWS)?;
                let column = index(address, "ram column", 4, 4, sram::COLUMNS)?;
                match bits(address, 0, 4) {
                    0 => Self::RamUse { row, column },
                    1 => Self::NibbleEnable { row, column },
                    _ => return Err(AdapterError::UnknownAddress(address)),
                }
            }
            region::ADIST => Self::AddressField {
                table: index(address, "logical table", 8, 4, LOGICAL_TABLES)?,
                origin: ORIGINS[bits(address, 7, 1)],
                class: AddressClass::ALL[index(address, "address class", 4, 3, AddressClass::ALL.len())?],
                word: AddressWord::ALL[bits(address, 0, 2)],
            },
            region::CROSSBAR => {
                let kind = KINDS[index(address, "selector kind", 8, 2, KINDS.len())?];
                Self::Crossbar { kind, slot: index(address, "action-data slot", 0, 8, kind.slots())? }
            }
            _ => return Err(AdapterError::UnknownAddress(address)),
        };
        canonical(address, decoded, Self::encode)
    }

    /// Encodes the address. Inverse of [`RegisterAddress::decode`].
    pub fn encode(&self) -> u32 {
        match *self {
            Self::TableEnable { table } => at(region::TABLE, &[(table, 8)]),
            Self::Predication { table } => at(region::TABLE, &[(table, 8), (1, 0)]),
            Self::ExactXbar { byte } => at(region::EXACT_XBAR, &[(byte, 0)]),
            Self::TcamXbar { byte } => at(region::TCAM_XBAR, &[(byte, 0)]),
            Self::TcamUnit { row, column } => at(region::TCAM_UNIT, &[(row, 4), (column, 0)]),
            Self::HashRow { group, bit, chunk } => at(region::HASH, &[(group, 12), (bit * HASH_CHUNKS + chunk, 0)]),
            Self::HashSeed { group, high } => {
                at(region::HASH, &[(group, 12), (if high { HASH_SEED_HI } else { HASH_SEED_LO }, 0)])
            }
            Self::ParityGroupMask { group } => at(region::HASH, &[(group, 12), (HASH_PARITY, 0)]),
            Self::WayCtl { table, way } => at(region::WAY, &[(table, 8), (way, 4)]),
            Self::WayRams { table, way, part } => at(region::WAY, &[(table, 8), (way, 4), (1 + part, 0)]),
            Self::WayKeyBytes { table, way, part } => {
                at(region::WAY, &[(table, 8), (way, 4), (1 + WAY_RAM_REGISTERS + part, 0)])
            }
            Self::RamUse { row, column } => at(region::RAM, &[(row, 8), (column, 4)]),
            Self::NibbleEnable { row, column } => at(region::RAM, &[(row, 8), (column, 4), (1, 0)]),
            Self::AddressField { table, origin, class, word } => {
                at(region::ADIST, &[(table, 8), (origin_index(origin), 7), (class.index(), 4), (word.index(), 0)])
            }
            Self::Crossbar { kind, slot } => at(region::CROSSBAR, &[(kind_index(kind), 8), (slot, 0)]),
        }
    }
}

impl RowAddress {
    /// Decodes a table-row address.
    pub fn decode(address: u32) -> Result<Self, AdapterError> {
        let decoded = match address >> 24 {
            region::TCAM_WORD => Self::TcamWord(TcamAddress {
                row: index(address, "tcam row", 10, 4, tcam::ROWS)?,
                column: index(address, "tcam column", 9, 1, tcam::COLUMNS)?,
                index: index(address, "tcam word", 0, 9, tcam::DEPTH)?,
            }),
            region::SRAM_WORD => Self::SramWord {
                row: index(address, "ram row", 14, 3, sram::ROWS)?,
                column: index(address, "ram column", 10, 4, sram::COLUMNS)?,
                word: index(address, "ram word", 0, 10, sram::DEPTH)?,
            },
            region::OPERATION => Self::Operation {
                slot: index(address, "instruction slot", 8, 6, SLOTS)?,
                op: index(address, "operation", 0, 8, OPS_PER_SLOT)?,
            },
            _ => return Err(AdapterError::UnknownAddress(address)),
        };
        canonical(address, decoded, Self::encode)
    }

    /// Encodes the address. Inverse of [`RowAddress::decode`].
    pub fn encode(&self) -> u32 {
        match *self {
            Self::TcamWord(TcamAddress { row, column, index }) => {
                at(region::TCAM_WORD, &[(row, 10), (column, 9), (index, 0)])
            }
            Self::SramWord { row, column, word } => at(region::SRAM_WORD, &[(row, 14), (column, 10), (word, 0)]),
            Self::Operation { slot, op } => at(region::OPERATION, &[(slot, 8), (op, 0)]),
        }
    }
}
