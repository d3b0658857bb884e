//! GF(2) hash engine.
//!
//! Output bit `i` of a hash group is the parity of the input bits selected by coefficient row `i`, XORed with
//! seed bit `i`. The transform is linear, so for any two inputs `a` and `b` of one group,
//! `hash(a ^ b) == hash(a) ^ hash(b) ^ hash(0)`, and `hash(0)` is the seed.

use crate::config::ConfigError;
use crate::constants::hash::*;
use crate::constants::ixbar::EXACT_BYTES;

/// Hash input: the exact-match crossbar packed into 64-bit words, byte 0 in the low bits of word 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashInput(pub [u64; INPUT_WORDS]);

impl HashInput {
    /// Packs crossbar bytes.
    pub fn from_bytes(bytes: &[u8; EXACT_BYTES]) -> Self {
        let mut words = [0u64; INPUT_WORDS];
        for (i, byte) in bytes.iter().enumerate() {
            words[i / 8] |= u64::from(*byte) << ((i % 8) * 8);
        }
        Self(words)
    }

    /// Bitwise XOR of two inputs.
    pub fn xor(&self, other: &Self) -> Self {
        let mut words = self.0;
        words.iter_mut().zip(other.0.iter()).for_each(|(w, o)| *w ^= o);
        Self(words)
    }
}

/// Coefficient matrices, seeds and parity-group masks of every hash group.
///
/// Kept as one arena indexed by `(group, output bit)` so a matrix row is a plain bit mask over the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMatrix {
    rows: Box<[[[u64; INPUT_WORDS]; OUTPUT_BITS]; GROUPS]>,
    seeds: [u64; GROUPS],
    parity_group_masks: [u16; GROUPS],
}

impl Default for HashMatrix {
    fn default() -> Self {
        Self {
            rows: Box::new([[[0; INPUT_WORDS]; OUTPUT_BITS]; GROUPS]),
            seeds: [0; GROUPS],
            parity_group_masks: [low_parity_mask(); GROUPS],
        }
    }
}

const fn low_parity_mask() -> u16 { u16::MAX >> (16 - PARITY_GROUPS) }

fn check_group(group: usize) -> Result<(), ConfigError> {
    if group < GROUPS {
        Ok(())
    } else {
        Err(ConfigError::IndexOutOfRange { what: "hash group", index: group, limit: GROUPS })
    }
}

fn check_output_bit(bit: usize) -> Result<(), ConfigError> {
    if bit < OUTPUT_BITS {
        Ok(())
    } else {
        Err(ConfigError::IndexOutOfRange { what: "hash output bit", index: bit, limit: OUTPUT_BITS })
    }
}

impl HashMatrix {
    /// Replaces coefficient row `bit` of a group.
    pub fn set_row(&mut self, group: usize, bit: usize, row: [u64; INPUT_WORDS]) -> Result<(), ConfigError> {
        check_group(group)?;
        check_output_bit(bit)?;
        self.rows[group][bit] = row;
        Ok(())
    }

    /// Coefficient row `bit` of a group.
    pub fn row(&self, group: usize, bit: usize) -> Option<&[u64; INPUT_WORDS]> { self.rows.get(group)?.get(bit) }

    /// Sets one coefficient.
    pub fn set_coefficient(
        &mut self, group: usize, bit: usize, input_bit: usize, value: bool,
    ) -> Result<(), ConfigError> {
        check_group(group)?;
        check_output_bit(bit)?;
        if input_bit >= INPUT_BITS {
            return Err(ConfigError::IndexOutOfRange { what: "hash input bit", index: input_bit, limit: INPUT_BITS });
        }
        let word = &mut self.rows[group][bit][input_bit / 64];
        if value {
            *word |= 1 << (input_bit % 64);
        } else {
            *word &= !(1 << (input_bit % 64));
        }
        Ok(())
    }

    /// Sets the seed of a group.
    pub fn set_seed(&mut self, group: usize, seed: u64) -> Result<(), ConfigError> {
        check_group(group)?;
        if seed & !OUTPUT_MASK != 0 {
            return Err(ConfigError::ValueTooWide { what: "hash seed", bits: OUTPUT_BITS });
        }
        self.seeds[group] = seed;
        Ok(())
    }

    /// Seed of a group.
    pub fn seed(&self, group: usize) -> Option<u64> { self.seeds.get(group).copied() }

    /// Sets which 64-bit input words feed a group.
    pub fn set_parity_group_mask(&mut self, group: usize, mask: u16) -> Result<(), ConfigError> {
        check_group(group)?;
        if mask & !low_parity_mask() != 0 {
            return Err(ConfigError::ValueTooWide { what: "parity group mask", bits: PARITY_GROUPS });
        }
        self.parity_group_masks[group] = mask;
        Ok(())
    }

    /// Parity-group mask of a group.
    pub fn parity_group_mask(&self, group: usize) -> Option<u16> { self.parity_group_masks.get(group).copied() }

    /// Computes the hash of a group. `None` if the group does not exist.
    pub fn hash(&self, group: usize, input: &HashInput) -> Option<u64> {
        check_group(group).ok()?;
        let mask = self.parity_group_masks[group];
        let mut masked = input.0;
        for (i, word) in masked.iter_mut().enumerate() {
            if mask & (1 << i) == 0 {
                *word = 0;
            }
        }

        let hash = self.rows[group].iter().enumerate().fold(self.seeds[group], |hash, (bit, row)| {
            let parity = row.iter().zip(masked.iter()).fold(0, |acc, (r, m)| acc ^ (r & m).count_ones()) & 1;
            hash ^ (u64::from(parity) << bit)
        });
        Some(hash)
    }
}

/// Extracts `width` bits starting at `lsb` of a hash value.
pub fn hash_bits(hash: u64, lsb: usize, width: usize) -> u64 {
    if lsb >= OUTPUT_BITS {
        0
    } else {
        (hash >> lsb) & crate::utils::low_mask(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(seed: u64) -> HashInput {
        let mut words = [0u64; INPUT_WORDS];
        let mut x = seed | 1;
        for word in words.iter_mut() {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            *word = x;
        }
        HashInput(words)
    }

    fn scrambled_matrix() -> HashMatrix {
        let mut matrix = HashMatrix::default();
        for bit in 0..OUTPUT_BITS {
            let HashInput(row) = input(bit as u64 * 0x9e37_79b9 + 11);
            matrix.set_row(3, bit, row).unwrap();
        }
        matrix.set_seed(3, 0x000a_bcde_f012_3456).unwrap();
        matrix
    }

    #[test]
    fn zero_input_hashes_to_seed() {
        let matrix = scrambled_matrix();
        assert_eq!(matrix.hash(3, &HashInput::default()), Some(0x000a_bcde_f012_3456));
    }

    #[test]
    fn hash_is_linear() {
        let matrix = scrambled_matrix();
        let zero = matrix.hash(3, &HashInput::default()).unwrap();
        for n in 0..16 {
            let a = input(n);
            let b = input(n + 100);
            let hash = |input: &HashInput| matrix.hash(3, input).unwrap();
            assert_eq!(hash(&a.xor(&b)), hash(&a) ^ hash(&b) ^ zero);
        }
    }

    #[test]
    fn single_coefficient_copies_input_bit() {
        let mut matrix = HashMatrix::default();
        matrix.set_coefficient(0, 5, 77, true).unwrap();
        let mut bytes = [0u8; EXACT_BYTES];
        bytes[9] = 1 << 5;
        assert_eq!(matrix.hash(0, &HashInput::from_bytes(&bytes)), Some(1 << 5));
        bytes[9] = 0;
        assert_eq!(matrix.hash(0, &HashInput::from_bytes(&bytes)), Some(0));
    }

    #[test]
    fn parity_groups_gate_input_words() {
        let mut matrix = HashMatrix::default();
        matrix.set_coefficient(1, 0, 64 * 2, true).unwrap();
        let mut words = [0u64; INPUT_WORDS];
        words[2] = 1;
        assert_eq!(matrix.hash(1, &HashInput(words)), Some(1));
        matrix.set_parity_group_mask(1, !(1 << 2)).unwrap();
        assert_eq!(matrix.hash(1, &HashInput(words)), Some(0));
    }

    #[test]
    fn output_stays_in_width() {
        let matrix = scrambled_matrix();
        for n in 0..8 {
            assert_eq!(matrix.hash(3, &input(n)).unwrap() & !OUTPUT_MASK, 0);
        }
        assert!(HashMatrix::default().set_seed(0, 1 << 52).is_err());
    }

    #[test]
    fn missing_groups_read_as_none() {
        let matrix = scrambled_matrix();
        assert_eq!(matrix.seed(GROUPS), None);
        assert_eq!(matrix.parity_group_mask(GROUPS), None);
        assert_eq!(matrix.hash(GROUPS, &input(1)), None);
        assert_eq!(matrix.seed(3), Some(0x000a_bcde_f012_3456));
    }

    #[test]
    fn hash_bits_extracts_fields() {
        assert_eq!(hash_bits(0xabc << 10, 10, 12), 0xabc);
        assert_eq!(hash_bits(u64::MAX, 60, 10), 0);
    }
}
