//! Register adapter of the MAU model.
//!
//! Software programs a stage through raw writes: `write_register(address, value)` for 32-bit control registers
//! and `write_table_row(address, word0, word1)` for TCAM words, SRAM words and instruction words. This crate
//! isolates that address space. [`address`] decodes the address map, [`layout`] declares the bit layout of
//! every register, and [`RegisterAdapter`] composes partial registers from its shadow register file into whole
//! [`mau::ConfigUnit`]s.

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
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
//
#![allow(clippy::type_complexity)]

pub mod adapter;
pub mod address;
pub mod layout;

pub use adapter::{AdapterError, RawWrite, RegisterAdapter};
pub use address::{AddressWord, RegisterAddress, RowAddress};

/// A value stored in a register field.
pub trait FieldValue: Sized {
    /// Decodes the field from its bits, already shifted down and masked.
    fn from_bits(bits: u128) -> Self;

    /// Encodes the field. Bits above the field width are dropped by the caller.
    fn to_bits(&self) -> u128;
}

impl FieldValue for bool {
    fn from_bits(bits: u128) -> Self { bits != 0 }

    fn to_bits(&self) -> u128 { u128::from(*self) }
}

impl RegisterLayout for bool {
    const WIDTH: usize = 1;

    fn unpack(raw: u128) -> Self { raw & 1 != 0 }

    fn pack(&self) -> u128 { u128::from(*self) }
}

/// Integers are fields of their own width, and registers holding one plain value.
macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn from_bits(bits: u128) -> Self { bits as $t }

                fn to_bits(&self) -> u128 { u128::from(*self) }
            }

            impl RegisterLayout for $t {
                const WIDTH: usize = <$t>::BITS as usize;

                fn unpack(raw: u128) -> Self { raw as $t }

                fn pack(&self) -> u128 { u128::from(*self) }
            }
        )*
    };
}

impl_integer!(u8, u16, u32, u64, u128);

/// Bit layout of a register, usually derived with `#[derive(Register)]`.
pub trait RegisterLayout: Sized {
    /// Bits up to and including the highest field.
    const WIDTH: usize;

    /// Decodes a raw register value. Bits outside every field are ignored.
    fn unpack(raw: u128) -> Self;

    /// Encodes the register. Bits outside every field are zero.
    fn pack(&self) -> u128;
}
