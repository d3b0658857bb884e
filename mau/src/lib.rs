//! MAU: behavioral model of one match-action unit stage of a programmable switch pipeline.
//!
//! A stage takes a packet header vector ([`Phv`]), looks every enabled logical table up in the ternary matcher
//! ([`tcam`]) and the hash-indexed exact-match engine ([`exact`], backed by [`sram`]), turns the match result
//! into derived addresses ([`adist`]), gathers action data onto the action-data bus ([`xbar`]), runs the
//! selected VLIW instruction ([`action`]) and merges the candidate writes back into the header vector
//! ([`predication`]).
//!
//! Configuration is a typed object graph ([`StageConfig`]) mutated only through [`MauStage::configure`]; packets
//! go through [`MauStage::process`], which only borrows the stage immutably.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::type_complexity)]
#![allow(elided_lifetimes_in_paths)]

pub mod action;
pub mod adist;
pub mod config;
pub mod constants;
pub mod diagnostic;
pub mod exact;
pub mod hash;
pub mod ixbar;
pub mod phv;
pub mod predication;
pub mod sram;
pub mod stage;
pub mod tcam;
pub mod utils;
pub mod xbar;

pub use action::{Instruction, InstructionMemory, Opcode, Operand, Operation};
pub use adist::{
    ActionDataAddress, AddressClass, AddressDistribution, AddressFieldConfig, AddressOrigin, DerivedAddresses,
    ResultBus, TableAddressConfig,
};
pub use config::{ConfigError, ConfigUnit, LogicalTableConfig, StageConfig};
pub use diagnostic::Diagnostic;
pub use exact::{ExactHit, ExactMatchRow, WayConfig};
pub use hash::{HashInput, HashMatrix};
pub use ixbar::{ByteSource, ExactXbar, InputXbar, TcamXbar};
pub use phv::{ContainerId, ContainerWidth, HeaderVectorContainer, Phv, PhvError};
pub use predication::{Merge, MergeState, PredicationRule};
pub use sram::{RamId, SramArray, UnitRamUse};
pub use stage::{MauStage, ProcessError, StageOutput, TableOutcome};
pub use tcam::{TcamAddress, TcamArray, TcamEntry, TcamUnitConfig};
pub use utils::*;
pub use xbar::{ActionDataBus, CrossbarConfig, HomeBuses, RowSide, Selector, SelectorKind, Side};
