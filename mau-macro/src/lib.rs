//! Derive macro for register bit layouts.
//!
//! # Note
//!
//! `#[derive(Register)]` lays the named fields of a struct out LSB-first, each field taking the width given by
//! its `#[field(width = N)]` attribute (`bool` fields default to one bit). `#[field(lsb = N)]` pins a field to
//! bit `N`, leaving reserved bits below it. The derived impl assumes `RegisterLayout` and `FieldValue` are in
//! scope.
//!
//! For example, the derived impl of the following struct places `shiftcount` in bits 0..6 and `enable` in bit 8.
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, Register)]
//! pub struct AddressShift {
//!     #[field(width = 6)]
//!     shiftcount: u8,
//!     #[field(lsb = 8)]
//!     enable: bool,
//! }
//!
//! impl RegisterLayout for AddressShift {
//!     const WIDTH: usize = 9;
//!     fn unpack(raw: u128) -> Self {
//!         Self {
//!             shiftcount: <u8 as FieldValue>::from_bits((raw >> 0usize) & 63u128),
//!             enable: <bool as FieldValue>::from_bits((raw >> 8usize) & 1u128),
//!         }
//!     }
//!     fn pack(&self) -> u128 { ... }
//! }
//! ```

mod register;
mod utils;

use proc_macro::{self, TokenStream};

#[proc_macro_derive(Register, attributes(field))]
pub fn register(input: TokenStream) -> TokenStream { register::derive(input) }
