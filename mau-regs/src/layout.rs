//! Bit layouts of the control registers and table rows.

use mau_macro::Register;
use static_assertions::const_assert;

use crate::{FieldValue, RegisterLayout};

/// Predication control of a logical table.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct PredicationCtl {
    pub enabled: bool,
    #[field(lsb = 8, width = 8)]
    pub priority: u8,
}

/// Source of one input crossbar byte.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct ByteSelect {
    /// Flat container index.
    #[field(width = 8)]
    pub container: u8,
    #[field(width = 2)]
    pub byte: u8,
    #[field(lsb = 31)]
    pub enable: bool,
}

/// TCAM unit control.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct TcamUnitCtl {
    #[field(width = 4)]
    pub logical_table: u8,
    pub table_enable: bool,
    #[field(lsb = 8, width = 4)]
    pub key_group: u8,
    #[field(lsb = 16)]
    pub chain_in: bool,
    pub output_enable: bool,
}

/// Exact-match way control.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct WayCtl {
    pub enable: bool,
    #[field(lsb = 4, width = 3)]
    pub hash_group: u8,
    #[field(lsb = 8, width = 6)]
    pub row_lsb: u8,
    #[field(lsb = 16, width = 6)]
    pub select_lsb: u8,
    #[field(lsb = 24, width = 2)]
    pub select_bits: u8,
}

/// One byte of a way's RAM list. Four fit in a register.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct RamSlot {
    #[field(width = 3)]
    pub row: u8,
    #[field(width = 4)]
    pub column: u8,
    pub valid: bool,
}

/// One byte of a way's key-byte list. Four fit in a register.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct KeyByteSlot {
    #[field(width = 7)]
    pub byte: u8,
    pub valid: bool,
}

/// Unit RAM use. `kind` is 0 for unused, 1 for match rows and 2 for action data.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct RamUseCtl {
    #[field(width = 2)]
    pub kind: u8,
    #[field(lsb = 4, width = 4)]
    pub table: u8,
    #[field(lsb = 8, width = 6)]
    pub vpn: u8,
}

/// Shift register of an address field. Mask, default and miss value take a whole register each.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct AddressShift {
    #[field(width = 6)]
    pub shiftcount: u8,
    #[field(lsb = 8, width = 3)]
    pub vpn_shiftcount: u8,
}

/// Action-data crossbar selector. `side` is set for the right half of the row.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct SelectorCtl {
    #[field(width = 3)]
    pub row: u8,
    pub side: bool,
    #[field(width = 4)]
    pub offset: u8,
    pub enable: bool,
    #[field(lsb = 31)]
    pub valid: bool,
}

/// One half of a TCAM word: `word0` holds the bits matching a key 0, `word1` the bits matching a key 1.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct TcamWord {
    #[field(width = 44)]
    pub data: u64,
    #[field(width = 2)]
    pub version: u8,
    pub valid: bool,
}

/// Exact-match row as stored in a 128-bit SRAM word. Key byte `i` is bits `8i..8i+8`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct ExactRowWord {
    #[field(width = 96)]
    pub key: u128,
    #[field(width = 12)]
    pub byte_mask: u16,
    #[field(width = 6)]
    pub vpn: u8,
    #[field(width = 2)]
    pub version: u8,
    pub valid: bool,
}

/// One operation of an instruction.
///
/// `opcode` is 0 to 6 for set, add, sub, and, or, xor and deposit-field. Operand tags are 0 for a container
/// (payload: flat index), 1 for action data (payload: kind in bits 6..5, slot in bits 4..0), 2 for the immediate
/// (payload: right shift) and 3 for a constant.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Register)]
pub struct OperationWord {
    pub valid: bool,
    #[field(width = 8)]
    pub dst: u8,
    #[field(width = 3)]
    pub opcode: u8,
    #[field(width = 5)]
    pub lsb: u8,
    #[field(width = 6)]
    pub width: u8,
    #[field(width = 2)]
    pub a_tag: u8,
    #[field(width = 18)]
    pub a: u32,
    #[field(width = 2)]
    pub b_tag: u8,
    #[field(width = 18)]
    pub b: u32,
}

const_assert!(<PredicationCtl as RegisterLayout>::WIDTH <= 32);
const_assert!(<ByteSelect as RegisterLayout>::WIDTH <= 32);
const_assert!(<TcamUnitCtl as RegisterLayout>::WIDTH <= 32);
const_assert!(<WayCtl as RegisterLayout>::WIDTH <= 32);
const_assert!(<RamSlot as RegisterLayout>::WIDTH <= 8);
const_assert!(<KeyByteSlot as RegisterLayout>::WIDTH <= 8);
const_assert!(<RamUseCtl as RegisterLayout>::WIDTH <= 32);
const_assert!(<AddressShift as RegisterLayout>::WIDTH <= 32);
const_assert!(<SelectorCtl as RegisterLayout>::WIDTH <= 32);
const_assert!(<TcamWord as RegisterLayout>::WIDTH <= 64);
const_assert!(<ExactRowWord as RegisterLayout>::WIDTH <= 128);
const_assert!(<OperationWord as RegisterLayout>::WIDTH <= 64);
