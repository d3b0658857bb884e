//! Diagnostics for configurations whose hardware outcome is ambiguous.
//!
//! The model never papers over these: the stage still produces a deterministic result, and the diagnostic
//! says which hardware behavior was assumed.

use std::fmt;

use crate::phv::ContainerId;
use crate::sram::RamId;
use crate::xbar::RowSide;

/// A configuration the hardware would resolve in an undefined or surprising way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Several exact-match ways hit in one lookup. The lowest way was committed.
    MultipleWayHits {
        /// Logical table.
        table: usize,
        /// Ways that hit, ascending.
        ways: Vec<usize>,
    },
    /// An exact-match way addressed a match RAM another table owns. The way missed.
    ForeignRam {
        /// Logical table looked up.
        table: usize,
        /// Way that addressed the RAM.
        way: usize,
        /// RAM addressed.
        ram: RamId,
        /// Table the RAM is allocated to.
        owner: usize,
    },
    /// An address-distribution shift count is at least the address width; the shifted field reads zero.
    ShiftCountOutOfRange {
        /// Logical table.
        table: usize,
        /// Configured shift.
        shiftcount: u8,
    },
    /// A TCAM unit claims a logical table but neither drives a result nor chains into a unit that does.
    DanglingTcamUnit {
        /// Row of the unit.
        row: usize,
        /// Column of the unit.
        column: usize,
    },
    /// Two tables delivered action data onto one home-row bus. The words were ORed.
    HomeBusCollision {
        /// Bus.
        bus: RowSide,
        /// Tables driving the bus, ascending.
        tables: Vec<usize>,
    },
    /// Two tables with the same predication priority wrote one container. The lower table won.
    PredicationTie {
        /// Container written.
        container: ContainerId,
        /// Tables that tied, ascending.
        tables: Vec<usize>,
    },
    /// A table's action-data address names a VPN no RAM of the table holds. The table delivered no action data.
    ActionDataUnmapped {
        /// Logical table.
        table: usize,
        /// Physical VPN requested.
        vpn: u32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleWayHits { table, ways } => write!(f, "table {}: ways {:?} hit together", table, ways),
            Self::ForeignRam { table, way, ram, owner } => {
                write!(f, "table {}: way {} addresses ram {} of table {}", table, way, ram, owner)
            }
            Self::ShiftCountOutOfRange { table, shiftcount } => {
                write!(f, "table {}: shift count {} exceeds the address width", table, shiftcount)
            }
            Self::DanglingTcamUnit { row, column } => {
                write!(f, "tcam unit ({}, {}) produces no result", row, column)
            }
            Self::HomeBusCollision { bus, tables } => write!(f, "home bus {} driven by tables {:?}", bus, tables),
            Self::PredicationTie { container, tables } => {
                write!(f, "container {} written by tables {:?} at equal priority", container, tables)
            }
            Self::ActionDataUnmapped { table, vpn } => write!(f, "table {}: no action RAM with vpn {}", table, vpn),
        }
    }
}

/// Records a diagnostic and logs it.
pub(crate) fn raise(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}
