//! Fixed geometry of one MAU stage.

use static_assertions::*;

use crate::utils::clog2;

/// Header vector.
pub mod phv {
    use super::*;

    /// Number of container groups.
    pub const GROUPS: usize = 14;
    /// Containers in one group.
    pub const GROUP_SIZE: usize = 16;
    /// Total number of containers.
    pub const CONTAINERS: usize = GROUPS * GROUP_SIZE;
    /// First group of 32-bit containers.
    pub const WORD_GROUPS_START: usize = 0;
    /// First group of 8-bit containers.
    pub const BYTE_GROUPS_START: usize = 4;
    /// First group of 16-bit containers.
    pub const HALF_GROUPS_START: usize = 8;
    /// Width of the packet version tag.
    pub const VERSION_BITS: usize = 2;

    const_assert!(WORD_GROUPS_START < BYTE_GROUPS_START);
    const_assert!(BYTE_GROUPS_START < HALF_GROUPS_START);
    const_assert!(HALF_GROUPS_START < GROUPS);
    const_assert_eq!(CONTAINERS, 224);
}

/// Input crossbars feeding the matchers.
pub mod ixbar {
    use super::*;

    /// Bytes of the exact-match input crossbar.
    pub const EXACT_BYTES: usize = 128;
    /// Bytes of one ternary key group.
    pub const TCAM_GROUP_BYTES: usize = 6;
    /// Number of ternary key groups.
    pub const TCAM_KEY_GROUPS: usize = 12;
    /// Bytes of the ternary input crossbar.
    pub const TCAM_BYTES: usize = TCAM_GROUP_BYTES * TCAM_KEY_GROUPS;

    const_assert!(TCAM_GROUP_BYTES * 8 >= super::tcam::WORD_BITS);
}

/// Ternary matcher.
pub mod tcam {
    use super::*;

    /// Rows of TCAM units.
    pub const ROWS: usize = 12;
    /// Columns of TCAM units.
    pub const COLUMNS: usize = 2;
    /// Words in one TCAM unit.
    pub const DEPTH: usize = 512;
    /// Searched bits of one TCAM word.
    pub const WORD_BITS: usize = 44;
    /// Version bits stored with each TCAM word.
    pub const VERSION_BITS: usize = 2;
    /// Mask of the searched bits.
    pub const WORD_MASK: u64 = (1 << WORD_BITS) - 1;

    /// Address bits for the word index.
    pub const INDEX_BITS: usize = clog2(DEPTH);
    /// Address bits for the column.
    pub const COLUMN_BITS: usize = clog2(COLUMNS);
    /// Address bits for the row.
    pub const ROW_BITS: usize = clog2(ROWS);

    const_assert_eq!(1 << INDEX_BITS, DEPTH);
    const_assert!(WORD_BITS <= 64);
}

/// SRAM array shared by exact-match and action-data storage.
pub mod sram {
    use super::*;

    /// Rows of unit RAMs.
    pub const ROWS: usize = 8;
    /// Columns of unit RAMs.
    pub const COLUMNS: usize = 12;
    /// Columns driving the left side of a row's home bus. The rest drive the right side.
    pub const LEFT_COLUMNS: usize = 6;
    /// Words in one unit RAM.
    pub const DEPTH: usize = 1024;
    /// Bits of one unit RAM word.
    pub const WORD_BITS: usize = 128;
    /// Address bits for the word index.
    pub const ROW_ADDRESS_BITS: usize = clog2(DEPTH);

    const_assert_eq!(1 << ROW_ADDRESS_BITS, DEPTH);
    const_assert!(LEFT_COLUMNS < COLUMNS);
}

/// Hash engine.
pub mod hash {
    use super::*;

    /// Number of independent hash groups.
    pub const GROUPS: usize = 8;
    /// Output bits of one hash group.
    pub const OUTPUT_BITS: usize = 52;
    /// Mask of the output bits.
    pub const OUTPUT_MASK: u64 = (1 << OUTPUT_BITS) - 1;
    /// Input bits of one hash group.
    pub const INPUT_BITS: usize = super::ixbar::EXACT_BYTES * 8;
    /// Input bits are held in this many 64-bit words.
    pub const INPUT_WORDS: usize = INPUT_BITS / 64;
    /// Parity groups: one 64-bit input word each.
    pub const PARITY_GROUPS: usize = INPUT_WORDS;

    const_assert_eq!(INPUT_BITS % 64, 0);
    const_assert!(PARITY_GROUPS > 0 && PARITY_GROUPS <= 16);
}

/// Exact-match engine.
pub mod exact {
    /// Ways a logical table can spread over.
    pub const MAX_WAYS: usize = 8;
    /// Unit RAMs one way can select between.
    pub const MAX_WAY_RAMS: usize = 8;
    /// Bytes of an exact-match key.
    pub const KEY_BYTES: usize = 12;
    /// Width of a VPN.
    pub const VPN_BITS: usize = 6;
    /// Width of the version tag.
    pub const VERSION_BITS: usize = 2;
    /// Hash bits selecting a RAM inside a way.
    pub const MAX_SELECT_BITS: usize = 3;

    static_assertions::const_assert!(1 << MAX_SELECT_BITS <= MAX_WAY_RAMS);
}

/// Logical tables and address distribution.
pub mod table {
    /// Logical tables in one stage.
    pub const LOGICAL_TABLES: usize = 16;
    /// Width of every derived address.
    pub const ADDRESS_BITS: usize = 32;
    /// Largest VPN shift of the action-data address.
    pub const MAX_VPN_SHIFT: u8 = 4;
    /// Action-data RAMs a logical table can own.
    pub const MAX_ACTION_RAMS: usize = 16;

    static_assertions::const_assert!(LOGICAL_TABLES % 2 == 0);
}

/// Action-data bus.
pub mod adb {
    /// Byte slots.
    pub const BYTE_SLOTS: usize = 32;
    /// Half-word slots.
    pub const HALF_SLOTS: usize = 32;
    /// Word slots.
    pub const WORD_SLOTS: usize = 32;

    static_assertions::const_assert_eq!(HALF_SLOTS % 2, 0);
}

/// Instruction memory.
pub mod imem {
    /// VLIW slots.
    pub const SLOTS: usize = 64;
}
