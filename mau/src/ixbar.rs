//! Input crossbars: assemble match keys from header-vector bytes.

use crate::config::ConfigError;
use crate::constants::ixbar::*;
use crate::phv::{ContainerId, Phv};

/// Source of one crossbar byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSource {
    /// Container read.
    pub container: ContainerId,
    /// Byte of the container, 0 being the least significant.
    pub byte: u8,
}

impl ByteSource {
    /// Checks the byte lies inside the container.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.byte < self.container.width().bytes() {
            Ok(())
        } else {
            Err(ConfigError::ByteOutsideContainer { container: self.container, byte: self.byte })
        }
    }
}

/// Byte selection of one input crossbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputXbar<const N: usize> {
    sources: [Option<ByteSource>; N],
}

impl<const N: usize> Default for InputXbar<N> {
    fn default() -> Self { Self { sources: [None; N] } }
}

impl<const N: usize> InputXbar<N> {
    /// Number of output bytes.
    pub const BYTES: usize = N;

    /// Selects the source of an output byte.
    pub fn select(&mut self, byte: usize, source: Option<ByteSource>) -> Result<(), ConfigError> {
        if byte >= N {
            return Err(ConfigError::IndexOutOfRange { what: "input crossbar byte", index: byte, limit: N });
        }
        if let Some(source) = &source {
            source.validate()?;
        }
        self.sources[byte] = source;
        Ok(())
    }

    /// Source of an output byte.
    pub fn source(&self, byte: usize) -> Option<ByteSource> { self.sources.get(byte).copied().flatten() }

    /// Assembles the crossbar output for a header vector. Unselected bytes are zero.
    pub fn assemble(&self, phv: &Phv) -> [u8; N] {
        let mut out = [0; N];
        for (byte, source) in out.iter_mut().zip(self.sources.iter()) {
            if let Some(ByteSource { container, byte: n }) = source {
                *byte = (phv.get(*container) >> (u32::from(*n) * 8)) as u8;
            }
        }
        out
    }
}

/// Crossbar feeding the hash engine and the exact-match comparators.
pub type ExactXbar = InputXbar<EXACT_BYTES>;

/// Crossbar feeding the TCAM key groups.
pub type TcamXbar = InputXbar<TCAM_BYTES>;

/// Returns the 44-bit search word of a TCAM key group.
pub fn tcam_search_word(bytes: &[u8; TCAM_BYTES], group: usize) -> u64 {
    let start = group * TCAM_GROUP_BYTES;
    bytes[start..start + TCAM_GROUP_BYTES]
        .iter()
        .rev()
        .fold(0u64, |word, byte| (word << 8) | u64::from(*byte))
        & crate::constants::tcam::WORD_MASK
}
