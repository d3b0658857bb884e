//! Composes raw register writes into configuration units.

use arrayvec::ArrayVec;
use linked_hash_map::LinkedHashMap;
use thiserror::Error;

use mau::constants::exact::KEY_BYTES;
use mau::constants::hash::INPUT_WORDS;
use mau::{
    ByteSource, ConfigError, ConfigUnit, ContainerId, ExactMatchRow, Instruction, MauStage, Opcode, Operand,
    Operation, RamId, RowSide, Selector, SelectorKind, Side, TcamEntry, TcamUnitConfig, UnitRamUse, WayConfig,
};

use crate::address::*;
use crate::layout::*;
use crate::RegisterLayout;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("no register at {0:#010x}")]
    UnknownAddress(u32),
    #[error("{what} {index} at {address:#010x} is out of range (limit {limit})")]
    IndexOutOfRange { address: u32, what: &'static str, index: usize, limit: usize },
    #[error("{raw:#x} is not a valid {what}")]
    InvalidEncoding { what: &'static str, raw: u128 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A raw write to the stage's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWrite {
    /// `write_register(address, value)`.
    Register {
        /// Register address.
        address: u32,
        /// Value.
        value: u32,
    },
    /// `write_table_row(address, word0, word1)`.
    TableRow {
        /// Row address.
        address: u32,
        /// Low word.
        word0: u64,
        /// High word.
        word1: u64,
    },
}

/// Decodes a layout, rejecting bits outside its fields.
fn decode<L: RegisterLayout>(what: &'static str, raw: u128) -> Result<L, AdapterError> {
    let layout = L::unpack(raw);
    if layout.pack() == raw {
        Ok(layout)
    } else {
        Err(AdapterError::InvalidEncoding { what, raw })
    }
}

/// Puts back the shadow value a failed write replaced.
fn restore<V>(shadow: &mut LinkedHashMap<u32, V>, address: u32, previous: Option<V>) {
    match previous {
        Some(previous) => {
            let _ = shadow.insert(address, previous);
        }
        None => {
            let _ = shadow.remove(&address);
        }
    }
}

fn byte_source(value: u128) -> Result<Option<ByteSource>, AdapterError> {
    let select = decode::<ByteSelect>("crossbar byte", value)?;
    if !select.enable {
        return Ok(None);
    }
    Ok(Some(ByteSource { container: container(u32::from(select.container))?, byte: select.byte }))
}

fn container(flat: u32) -> Result<ContainerId, AdapterError> {
    Ok(ContainerId::from_flat(flat as usize).map_err(ConfigError::from)?)
}

fn operand(tag: u8, payload: u32) -> Result<Operand, AdapterError> {
    Ok(match tag {
        0 => Operand::Container(container(payload)?),
        1 => {
            let kind = match payload >> 5 {
                0 => SelectorKind::Byte,
                1 => SelectorKind::Half,
                2 => SelectorKind::Word,
                _ => return Err(AdapterError::InvalidEncoding { what: "operand", raw: payload.into() }),
            };
            Operand::ActionData { kind, slot: (payload & 0x1f) as usize }
        }
        2 => match u8::try_from(payload) {
            Ok(shift) => Operand::Immediate { shift },
            Err(_) => return Err(AdapterError::InvalidEncoding { what: "operand", raw: payload.into() }),
        },
        _ => Operand::Constant(payload),
    })
}

fn operation(word: &OperationWord) -> Result<Operation, AdapterError> {
    let opcode = match word.opcode {
        0 => Opcode::Set,
        1 => Opcode::Add,
        2 => Opcode::Sub,
        3 => Opcode::And,
        4 => Opcode::Or,
        5 => Opcode::Xor,
        6 => Opcode::DepositField { lsb: word.lsb, width: word.width },
        _ => return Err(AdapterError::InvalidEncoding { what: "opcode", raw: word.opcode.into() }),
    };
    Ok(Operation { opcode, a: operand(word.a_tag, word.a)?, b: operand(word.b_tag, word.b)? })
}

/// Register adapter.
///
/// Holds a shadow of every register and instruction row written so far. Each write updates the shadow and
/// yields the whole configuration unit the touched register belongs to, recomposed from the shadow. A write
/// that cannot be composed leaves the shadow unchanged.
#[derive(Debug, Default, Clone)]
pub struct RegisterAdapter {
    registers: LinkedHashMap<u32, u32>,
    rows: LinkedHashMap<u32, u128>,
}

impl RegisterAdapter {
    /// Creates an adapter with every register zero.
    pub fn new() -> Self { Self::default() }

    /// Shadow value of a register.
    pub fn register(&self, register: RegisterAddress) -> u32 {
        self.registers.get(&register.encode()).copied().unwrap_or(0)
    }

    /// Decodes `write_register(address, value)`.
    ///
    /// Returns `None` for registers that only take effect through later writes (nibble enables, read when
    /// exact-match rows are written).
    pub fn write_register(&mut self, address: u32, value: u32) -> Result<Option<ConfigUnit>, AdapterError> {
        let register = RegisterAddress::decode(address)?;
        let previous = self.registers.insert(address, value);
        let unit = self.compose(register);
        if unit.is_err() {
            restore(&mut self.registers, address, previous);
        } else {
            log::debug!("{:#010x} <- {:#010x}: {:?}", address, value, register);
        }
        unit
    }

    /// Decodes `write_table_row(address, word0, word1)`.
    pub fn write_table_row(&mut self, address: u32, word0: u64, word1: u64) -> Result<ConfigUnit, AdapterError> {
        let unit = match RowAddress::decode(address)? {
            RowAddress::TcamWord(at) => {
                let zero = decode::<TcamWord>("tcam word", word0.into())?;
                let one = decode::<TcamWord>("tcam word", word1.into())?;
                if !zero.valid && !one.valid {
                    ConfigUnit::TcamClear(at)
                } else {
                    ConfigUnit::TcamEntry(TcamEntry {
                        address: at,
                        value0: zero.data,
                        value1: one.data,
                        version: zero.version,
                        enabled: zero.valid && one.valid,
                    })
                }
            }
            RowAddress::SramWord { row: ram_row, column, word } => {
                let ram = RamId::new(ram_row, column)?;
                let raw = u128::from(word0) | (u128::from(word1) << 64);
                match self.ram_use(ram_row, column)? {
                    UnitRamUse::Match { .. } => {
                        let stored = decode::<ExactRowWord>("exact-match row", raw)?;
                        let mut key = [0; KEY_BYTES];
                        key.copy_from_slice(&stored.key.to_le_bytes()[..KEY_BYTES]);
                        let entry = ExactMatchRow {
                            valid: stored.valid,
                            vpn: stored.vpn,
                            key,
                            byte_mask: stored.byte_mask,
                            nibble_enable: self.register(RegisterAddress::NibbleEnable { row: ram_row, column }),
                            version: stored.version,
                        };
                        ConfigUnit::ExactRow { ram, row: word, entry }
                    }
                    _ => ConfigUnit::ActionWord { ram, row: word, word: raw },
                }
            }
            RowAddress::Operation { slot, .. } => {
                let raw = u128::from(word0) | (u128::from(word1) << 64);
                let _ = decode::<OperationWord>("operation", raw)?;
                let previous = self.rows.insert(address, raw);
                let instruction = self.instruction(slot);
                if instruction.is_err() {
                    restore(&mut self.rows, address, previous);
                }
                ConfigUnit::Instruction { slot, instruction: instruction? }
            }
        };
        log::debug!("{:#010x} <- {:#018x}_{:016x}", address, word1, word0);
        Ok(unit)
    }

    /// Decodes a raw write and applies it to `stage`.
    ///
    /// A unit the stage rejects leaves the shadow as it was before the write.
    pub fn program(&mut self, stage: &mut MauStage, write: RawWrite) -> Result<(), AdapterError> {
        match write {
            RawWrite::Register { address, value } => {
                let previous = self.registers.get(&address).copied();
                let unit = mau::some_or!(self.write_register(address, value)?, return Ok(()));
                if let Err(error) = stage.configure(unit) {
                    restore(&mut self.registers, address, previous);
                    return Err(error.into());
                }
            }
            RawWrite::TableRow { address, word0, word1 } => {
                let previous = self.rows.get(&address).copied();
                let unit = self.write_table_row(address, word0, word1)?;
                if let Err(error) = stage.configure(unit) {
                    restore(&mut self.rows, address, previous);
                    return Err(error.into());
                }
            }
        }
        Ok(())
    }

    fn compose(&self, register: RegisterAddress) -> Result<Option<ConfigUnit>, AdapterError> {
        let value = u128::from(self.register(register));
        let unit = match register {
            RegisterAddress::TableEnable { table } => {
                ConfigUnit::TableEnable { table, enabled: decode::<bool>("table enable", value)? }
            }
            RegisterAddress::Predication { table } => {
                let ctl = decode::<PredicationCtl>("predication control", value)?;
                ConfigUnit::Predication {
                    table,
                    rule: mau::PredicationRule { enabled: ctl.enabled, priority: ctl.priority },
                }
            }
            RegisterAddress::ExactXbar { byte } => ConfigUnit::ExactXbarByte { byte, source: byte_source(value)? },
            RegisterAddress::TcamXbar { byte } => ConfigUnit::TcamXbarByte { byte, source: byte_source(value)? },
            RegisterAddress::TcamUnit { row, column } => {
                let ctl = decode::<TcamUnitCtl>("tcam unit control", value)?;
                let config = TcamUnitConfig {
                    logical_table: ctl.table_enable.then(|| usize::from(ctl.logical_table)),
                    key_group: usize::from(ctl.key_group),
                    chain_in: ctl.chain_in,
                    output_enable: ctl.output_enable,
                };
                ConfigUnit::TcamUnit { row, column, config }
            }
            RegisterAddress::HashRow { group, bit, .. } => {
                let mut row = [0; INPUT_WORDS];
                for chunk in 0..HASH_CHUNKS {
                    let value = self.register(RegisterAddress::HashRow { group, bit, chunk });
                    row[chunk / 2] |= u64::from(value) << (32 * (chunk % 2));
                }
                ConfigUnit::HashRow { group, bit, row }
            }
            RegisterAddress::HashSeed { group, .. } => {
                let lo = self.register(RegisterAddress::HashSeed { group, high: false });
                let hi = self.register(RegisterAddress::HashSeed { group, high: true });
                ConfigUnit::HashSeed { group, seed: u64::from(lo) | (u64::from(hi) << 32) }
            }
            RegisterAddress::ParityGroupMask { group } => {
                let mask = decode::<u16>("parity group mask", value)?;
                ConfigUnit::ParityGroupMask { group, mask }
            }
            RegisterAddress::WayCtl { table, way }
            | RegisterAddress::WayRams { table, way, .. }
            | RegisterAddress::WayKeyBytes { table, way, .. } => {
                ConfigUnit::Way { table, way, config: self.way(table, way)? }
            }
            RegisterAddress::RamUse { row, column } => {
                ConfigUnit::RamUse { ram: RamId::new(row, column)?, usage: self.ram_use(row, column)? }
            }
            RegisterAddress::NibbleEnable { .. } => {
                if value >> (2 * KEY_BYTES) != 0 {
                    return Err(AdapterError::InvalidEncoding { what: "nibble enable", raw: value });
                }
                return Ok(None);
            }
            RegisterAddress::AddressField { table, origin, class, .. } => {
                let read = |word| self.register(RegisterAddress::AddressField { table, origin, class, word });
                let shift = decode::<AddressShift>("address shift", read(AddressWord::Shift).into())?;
                let config = mau::AddressFieldConfig {
                    shiftcount: shift.shiftcount,
                    mask: read(AddressWord::Mask),
                    default_value: read(AddressWord::Default),
                    miss_value: read(AddressWord::Miss),
                    vpn_shiftcount: shift.vpn_shiftcount,
                };
                ConfigUnit::AddressField { table, origin, class, config }
            }
            RegisterAddress::Crossbar { kind, slot } => {
                let ctl = decode::<SelectorCtl>("crossbar selector", value)?;
                let side = if ctl.side { Side::Right } else { Side::Left };
                let selector = ctl.valid.then(|| Selector {
                    source: RowSide { row: usize::from(ctl.row), side },
                    offset: usize::from(ctl.offset),
                    enable: ctl.enable,
                });
                ConfigUnit::Crossbar { kind, slot, selector }
            }
        };
        Ok(Some(unit))
    }

    fn ram_use(&self, row: usize, column: usize) -> Result<UnitRamUse, AdapterError> {
        let value = self.register(RegisterAddress::RamUse { row, column });
        let ctl = decode::<RamUseCtl>("ram use", value.into())?;
        let (table, vpn) = (usize::from(ctl.table), ctl.vpn);
        match ctl.kind {
            0 => Ok(UnitRamUse::Unused),
            1 => Ok(UnitRamUse::Match { table, vpn }),
            2 => Ok(UnitRamUse::ActionData { table, vpn }),
            _ => Err(AdapterError::InvalidEncoding { what: "ram use", raw: value.into() }),
        }
    }

    fn way(&self, table: usize, way: usize) -> Result<Option<WayConfig>, AdapterError> {
        let ctl = decode::<WayCtl>("way control", self.register(RegisterAddress::WayCtl { table, way }).into())?;
        if !ctl.enable {
            return Ok(None);
        }
        let mut rams = ArrayVec::new();
        for part in 0..WAY_RAM_REGISTERS {
            let value = self.register(RegisterAddress::WayRams { table, way, part });
            for slot in value.to_le_bytes() {
                let slot = RamSlot::unpack(slot.into());
                if slot.valid {
                    rams.push(RamId::new(usize::from(slot.row), usize::from(slot.column))?);
                }
            }
        }
        let mut key_bytes = ArrayVec::new();
        for part in 0..WAY_KEY_REGISTERS {
            let value = self.register(RegisterAddress::WayKeyBytes { table, way, part });
            for slot in value.to_le_bytes() {
                let slot = KeyByteSlot::unpack(slot.into());
                if slot.valid {
                    key_bytes.push(usize::from(slot.byte));
                }
            }
        }
        Ok(Some(WayConfig {
            hash_group: usize::from(ctl.hash_group),
            row_lsb: usize::from(ctl.row_lsb),
            select_lsb: usize::from(ctl.select_lsb),
            select_bits: usize::from(ctl.select_bits),
            rams,
            key_bytes,
        }))
    }

    fn instruction(&self, slot: usize) -> Result<Option<Instruction>, AdapterError> {
        let mut instruction = Instruction::default();
        for op in 0..OPS_PER_SLOT {
            let raw = mau::some_or!(self.rows.get(&RowAddress::Operation { slot, op }.encode()), continue);
            let word = OperationWord::unpack(*raw);
            if word.valid {
                instruction = instruction.with(container(u32::from(word.dst))?, operation(&word)?);
            }
        }
        Ok(if instruction.ops.is_empty() { None } else { Some(instruction) })
    }
}
