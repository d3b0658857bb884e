//! Header-vector container store.
//!
//! The header vector is a fixed arena of [`constants::phv::CONTAINERS`](crate::constants::phv::CONTAINERS)
//! containers. A container's width is a function of its group, so a container can never change width.

use std::fmt;

use thiserror::Error;

use crate::constants::phv::*;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhvError {
    #[error("container {0} does not exist")]
    NoSuchContainer(ContainerId),
    #[error("container {id} is {expected:?} but was handed over as {found:?}")]
    WidthMismatch { id: ContainerId, expected: ContainerWidth, found: ContainerWidth },
    #[error("container {0} is handed over twice")]
    Duplicate(ContainerId),
    #[error("byte {byte} is outside container {id}")]
    NoSuchByte { id: ContainerId, byte: u8 },
}

/// Width of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerWidth {
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
}

impl ContainerWidth {
    /// Returns the number of bits.
    pub const fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
        }
    }

    /// Returns the number of bytes.
    pub const fn bytes(self) -> u8 { (self.bits() / 8) as u8 }

    /// Returns the mask of valid value bits.
    pub const fn mask(self) -> u32 {
        match self {
            Self::W8 => 0xff,
            Self::W16 => 0xffff,
            Self::W32 => 0xffff_ffff,
        }
    }
}

/// Identifier of a container: `(group, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId {
    group: u8,
    index: u8,
}

impl ContainerId {
    /// Creates an identifier.
    pub fn new(group: u8, index: u8) -> Result<Self, PhvError> {
        let id = Self { group, index };
        if usize::from(group) < GROUPS && usize::from(index) < GROUP_SIZE {
            Ok(id)
        } else {
            Err(PhvError::NoSuchContainer(id))
        }
    }

    /// Creates an identifier from its position in the arena.
    pub fn from_flat(flat: usize) -> Result<Self, PhvError> {
        Self::new((flat / GROUP_SIZE).min(u8::MAX.into()) as u8, (flat % GROUP_SIZE) as u8)
    }

    /// The `n`th 32-bit container.
    pub fn word(n: usize) -> Result<Self, PhvError> { Self::from_flat(WORD_GROUPS_START * GROUP_SIZE + n) }

    /// The `n`th 8-bit container.
    pub fn byte(n: usize) -> Result<Self, PhvError> { Self::from_flat(BYTE_GROUPS_START * GROUP_SIZE + n) }

    /// The `n`th 16-bit container.
    pub fn half(n: usize) -> Result<Self, PhvError> { Self::from_flat(HALF_GROUPS_START * GROUP_SIZE + n) }

    /// Group of the container.
    pub fn group(self) -> u8 { self.group }

    /// Index in the group.
    pub fn index(self) -> u8 { self.index }

    /// Position in the arena.
    pub fn flat(self) -> usize { usize::from(self.group) * GROUP_SIZE + usize::from(self.index) }

    /// Width of the container, fixed by its group.
    pub fn width(self) -> ContainerWidth {
        let group = usize::from(self.group);
        if group >= HALF_GROUPS_START {
            ContainerWidth::W16
        } else if group >= BYTE_GROUPS_START {
            ContainerWidth::W8
        } else {
            ContainerWidth::W32
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "({}, {})", self.group, self.index) }
}

/// One container as the parser hands it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderVectorContainer {
    /// Identifier.
    pub id: ContainerId,
    /// Declared width. Must agree with the group of `id`.
    pub width: ContainerWidth,
    /// Value. Bits above `width` are ignored.
    pub value: u32,
    /// Whether the parser wrote the container.
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    value: u32,
    valid: bool,
}

/// Header vector of one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phv {
    slots: Box<[Slot; CONTAINERS]>,
    version: u8,
}

impl Default for Phv {
    fn default() -> Self { Self::new() }
}

impl Phv {
    /// Creates a header vector with every container zero and invalid.
    pub fn new() -> Self { Self { slots: Box::new([Slot::default(); CONTAINERS]), version: 0 } }

    /// Builds a header vector from the containers the parser produced.
    pub fn from_containers<I>(containers: I) -> Result<Self, PhvError>
    where I: IntoIterator<Item = HeaderVectorContainer> {
        let mut phv = Self::new();
        let mut seen = [false; CONTAINERS];
        for container in containers {
            let id = ContainerId::new(container.id.group, container.id.index)?;
            if id.width() != container.width {
                return Err(PhvError::WidthMismatch { id, expected: id.width(), found: container.width });
            }
            if std::mem::replace(&mut seen[id.flat()], true) {
                return Err(PhvError::Duplicate(id));
            }
            phv.slots[id.flat()] = Slot { value: container.value & id.width().mask(), valid: container.valid };
        }
        Ok(phv)
    }

    /// Packet version tag.
    pub fn version(&self) -> u8 { self.version }

    /// Sets the packet version tag.
    pub fn set_version(&mut self, version: u8) { self.version = version & ((1 << VERSION_BITS) - 1) }

    /// Value of a container. Invalid containers read as zero.
    pub fn get(&self, id: ContainerId) -> u32 {
        let slot = self.slots[id.flat()];
        if slot.valid {
            slot.value
        } else {
            0
        }
    }

    /// Whether a container holds a value.
    pub fn is_valid(&self, id: ContainerId) -> bool { self.slots[id.flat()].valid }

    /// Writes a container, truncating the value to the container width.
    pub fn set(&mut self, id: ContainerId, value: u32) {
        self.slots[id.flat()] = Slot { value: value & id.width().mask(), valid: true };
    }

    /// Invalidates a container.
    pub fn invalidate(&mut self, id: ContainerId) { self.slots[id.flat()] = Slot::default() }

    /// Byte `byte` of a container, byte 0 being the least significant.
    pub fn byte(&self, id: ContainerId, byte: u8) -> Result<u8, PhvError> {
        if byte >= id.width().bytes() {
            return Err(PhvError::NoSuchByte { id, byte });
        }
        Ok((self.get(id) >> (u32::from(byte) * 8)) as u8)
    }

    /// Iterates over all containers in `(group, index)` order.
    pub fn iter(&self) -> impl Iterator<Item = HeaderVectorContainer> + '_ {
        self.slots.iter().enumerate().map(|(flat, slot)| {
            let id = ContainerId { group: (flat / GROUP_SIZE) as u8, index: (flat % GROUP_SIZE) as u8 };
            HeaderVectorContainer { id, width: id.width(), value: slot.value, valid: slot.valid }
        })
    }

    /// Iterates over the valid containers in `(group, index)` order.
    pub fn containers(&self) -> impl Iterator<Item = HeaderVectorContainer> + '_ { self.iter().filter(|c| c.valid) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_group() {
        assert_eq!(ContainerId::word(0).unwrap().width(), ContainerWidth::W32);
        assert_eq!(ContainerId::byte(0).unwrap().width(), ContainerWidth::W8);
        assert_eq!(ContainerId::half(95).unwrap().width(), ContainerWidth::W16);
        assert!(ContainerId::half(96).is_err());
        assert!(ContainerId::new(14, 0).is_err());
        assert!(ContainerId::new(0, 16).is_err());
    }

    #[test]
    fn set_truncates_to_width() {
        let mut phv = Phv::new();
        let b = ContainerId::byte(3).unwrap();
        phv.set(b, 0x1234);
        assert_eq!(phv.get(b), 0x34);
        assert!(phv.is_valid(b));
        phv.invalidate(b);
        assert_eq!(phv.get(b), 0);
    }

    #[test]
    fn from_containers_rejects_malformed_input() {
        let w = ContainerId::word(1).unwrap();
        let bad_width = HeaderVectorContainer { id: w, width: ContainerWidth::W16, value: 1, valid: true };
        assert_eq!(
            Phv::from_containers([bad_width]),
            Err(PhvError::WidthMismatch { id: w, expected: ContainerWidth::W32, found: ContainerWidth::W16 })
        );

        let good = HeaderVectorContainer { id: w, width: ContainerWidth::W32, value: 7, valid: true };
        assert_eq!(Phv::from_containers([good, good]), Err(PhvError::Duplicate(w)));

        let phv = Phv::from_containers([good]).unwrap();
        assert_eq!(phv.get(w), 7);
        assert_eq!(phv.containers().count(), 1);
    }

    #[test]
    fn iteration_is_ordered() {
        let phv = Phv::new();
        let ids = phv.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids.len(), CONTAINERS);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bytes_are_little_endian() {
        let mut phv = Phv::new();
        let w = ContainerId::word(0).unwrap();
        phv.set(w, 0xaabb_ccdd);
        assert_eq!(phv.byte(w, 0).unwrap(), 0xdd);
        assert_eq!(phv.byte(w, 3).unwrap(), 0xaa);
        assert!(phv.byte(w, 4).is_err());
    }
}
