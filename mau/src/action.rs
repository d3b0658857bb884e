//! VLIW instruction memory and execution.
//!
//! An instruction is a set of operations, one per destination container. Every operand reads the header vector
//! as it entered the stage, so operations of one instruction never see each other's results. Results are
//! truncated to the destination width.

use crate::config::ConfigError;
use crate::constants::imem::SLOTS;
use crate::phv::{ContainerId, Phv};
use crate::utils::{deposit, shr_or_zero};
use crate::xbar::{ActionDataBus, SelectorKind};

/// Operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `a`.
    Set,
    /// `a + b`, wrapping.
    Add,
    /// `a - b`, wrapping.
    Sub,
    /// `a & b`.
    And,
    /// `a | b`.
    Or,
    /// `a ^ b`.
    Xor,
    /// `b` with `width` bits at `lsb` replaced by the low bits of `a`.
    DepositField {
        /// Lowest replaced bit.
        lsb: u8,
        /// Replaced bits.
        width: u8,
    },
}

/// Operand of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A header-vector container, as it entered the stage.
    Container(ContainerId),
    /// A slot of the action-data bus.
    ActionData {
        /// Slot width.
        kind: SelectorKind,
        /// Slot.
        slot: usize,
    },
    /// The table's immediate-data address shifted right.
    Immediate {
        /// Right shift.
        shift: u8,
    },
    /// A constant.
    Constant(u32),
}

impl Operand {
    fn check(&self) -> Result<(), ConfigError> {
        match self {
            Self::ActionData { kind, slot } if *slot >= kind.slots() => {
                Err(ConfigError::IndexOutOfRange { what: "action-data slot", index: *slot, limit: kind.slots() })
            }
            _ => Ok(()),
        }
    }

    fn read(&self, inputs: &Inputs<'_>) -> u32 {
        match self {
            Self::Container(id) => inputs.phv.get(*id),
            Self::ActionData { kind, slot } => inputs.adb.get(*kind, *slot),
            Self::Immediate { shift } => shr_or_zero(inputs.immediate, u32::from(*shift)),
            Self::Constant(value) => *value,
        }
    }
}

/// One operation of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Operation code.
    pub opcode: Opcode,
    /// First operand.
    pub a: Operand,
    /// Second operand. Ignored by [`Opcode::Set`].
    pub b: Operand,
}

impl Operation {
    /// `dst = a`.
    pub fn set(a: Operand) -> Self { Self { opcode: Opcode::Set, a, b: Operand::Constant(0) } }

    fn check(&self) -> Result<(), ConfigError> {
        if let Opcode::DepositField { lsb, width } = self.opcode {
            if u32::from(lsb) + u32::from(width) > 32 {
                return Err(ConfigError::FieldOutsideContainer { lsb, width });
            }
        }
        self.a.check()?;
        self.b.check()
    }

    fn evaluate(&self, inputs: &Inputs<'_>) -> u32 {
        let a = self.a.read(inputs);
        let b = self.b.read(inputs);
        match self.opcode {
            Opcode::Set => a,
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::And => a & b,
            Opcode::Or => a | b,
            Opcode::Xor => a ^ b,
            Opcode::DepositField { lsb, width } => deposit(b, a, u32::from(lsb), u32::from(width)),
        }
    }
}

/// What the operands of one table's instruction read.
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    /// Header vector as it entered the stage.
    pub phv: &'a Phv,
    /// Action-data bus of the traversal.
    pub adb: &'a ActionDataBus,
    /// Immediate-data address of the table.
    pub immediate: u32,
}

/// A VLIW instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Operations with their destination containers.
    pub ops: Vec<(ContainerId, Operation)>,
}

impl Instruction {
    /// Adds an operation.
    pub fn with(mut self, dst: ContainerId, op: Operation) -> Self {
        self.ops.push((dst, op));
        self
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        for (i, (dst, op)) in self.ops.iter().enumerate() {
            if self.ops[..i].iter().any(|(other, _)| other == dst) {
                return Err(ConfigError::DuplicateDestination(*dst));
            }
            op.check()?;
        }
        Ok(())
    }

    /// Candidate writes of the instruction, truncated to the destination width.
    pub fn execute<'a>(&'a self, inputs: Inputs<'a>) -> impl Iterator<Item = (ContainerId, u32)> + 'a {
        self.ops.iter().map(move |(dst, op)| (*dst, op.evaluate(&inputs) & dst.width().mask()))
    }
}

/// Instruction memory of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionMemory {
    slots: Vec<Option<Instruction>>,
}

impl Default for InstructionMemory {
    fn default() -> Self { Self { slots: vec![None; SLOTS] } }
}

impl InstructionMemory {
    /// Writes a slot. `None` empties it.
    pub fn write(&mut self, slot: usize, instruction: Option<Instruction>) -> Result<(), ConfigError> {
        if slot >= SLOTS {
            return Err(ConfigError::IndexOutOfRange { what: "instruction slot", index: slot, limit: SLOTS });
        }
        if let Some(instruction) = &instruction {
            instruction.check()?;
        }
        self.slots[slot] = instruction;
        Ok(())
    }

    /// Instruction of a slot.
    pub fn get(&self, slot: usize) -> Option<&Instruction> { self.slots.get(slot)?.as_ref() }

    /// Instruction selected by a derived instruction address: its low bits pick the slot.
    pub fn fetch(&self, address: u32) -> Option<&Instruction> { self.get(address as usize % SLOTS) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(instruction: &Instruction, phv: &Phv, adb: &ActionDataBus, immediate: u32) -> Vec<(ContainerId, u32)> {
        instruction.execute(Inputs { phv, adb, immediate }).collect()
    }

    #[test]
    fn operands_read_the_incoming_phv() {
        let w0 = ContainerId::word(0).unwrap();
        let w1 = ContainerId::word(1).unwrap();
        let mut phv = Phv::new();
        phv.set(w0, 10);
        phv.set(w1, 3);

        let swap = Instruction::default()
            .with(w0, Operation::set(Operand::Container(w1)))
            .with(w1, Operation::set(Operand::Container(w0)));
        assert_eq!(run(&swap, &phv, &ActionDataBus::default(), 0), vec![(w0, 3), (w1, 10)]);
    }

    #[test]
    fn results_truncate_to_width() {
        let b0 = ContainerId::byte(0).unwrap();
        let h0 = ContainerId::half(0).unwrap();
        let op = Operation { opcode: Opcode::Sub, a: Operand::Constant(0), b: Operand::Constant(1) };
        let instruction = Instruction::default().with(b0, op).with(h0, op);
        assert_eq!(run(&instruction, &Phv::new(), &ActionDataBus::default(), 0), vec![(b0, 0xff), (h0, 0xffff)]);
    }

    #[test]
    fn deposit_and_immediate() {
        let w2 = ContainerId::word(2).unwrap();
        let mut phv = Phv::new();
        phv.set(w2, 0xffff_ffff);
        let op = Operation {
            opcode: Opcode::DepositField { lsb: 8, width: 8 },
            a: Operand::Immediate { shift: 4 },
            b: Operand::Container(w2),
        };
        let instruction = Instruction::default().with(w2, op);
        assert_eq!(run(&instruction, &phv, &ActionDataBus::default(), 0xab0), vec![(w2, 0xffff_abff)]);
    }

    #[test]
    fn instructions_are_checked() {
        let w0 = ContainerId::word(0).unwrap();
        let mut imem = InstructionMemory::default();
        let twice = Instruction::default()
            .with(w0, Operation::set(Operand::Constant(1)))
            .with(w0, Operation::set(Operand::Constant(2)));
        assert_eq!(imem.write(0, Some(twice)), Err(ConfigError::DuplicateDestination(w0)));

        let bad_slot = Instruction::default()
            .with(w0, Operation::set(Operand::ActionData { kind: SelectorKind::Word, slot: 32 }));
        assert!(imem.write(0, Some(bad_slot)).is_err());

        let bad_field = Operation {
            opcode: Opcode::DepositField { lsb: 30, width: 4 },
            a: Operand::Constant(0),
            b: Operand::Constant(0),
        };
        assert!(imem.write(0, Some(Instruction::default().with(w0, bad_field))).is_err());
        assert!(imem.write(SLOTS, None).is_err());
    }

    #[test]
    fn fetch_wraps_the_address() {
        let mut imem = InstructionMemory::default();
        let w0 = ContainerId::word(0).unwrap();
        imem.write(3, Some(Instruction::default().with(w0, Operation::set(Operand::Constant(1))))).unwrap();
        assert!(imem.fetch(3).is_some());
        assert!(imem.fetch(64 + 3).is_some());
        assert!(imem.fetch(4).is_none());
    }
}
