//! Drives a stage purely through raw register writes.

use mau::constants::hash::OUTPUT_BITS;
use mau::constants::tcam::WORD_MASK;
use mau::{AddressClass, AddressOrigin, ConfigError, ContainerId, MauStage, Phv, TcamAddress};
use mau_regs::address::SLOTS_PER_REGISTER;
use mau_regs::layout::*;
use mau_regs::*;

fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

#[derive(Debug, Default)]
struct Device {
    adapter: RegisterAdapter,
    stage: MauStage,
}

impl Device {
    fn write_register<L: RegisterLayout>(&mut self, register: RegisterAddress, value: L) {
        let write = RawWrite::Register { address: register.encode(), value: value.pack() as u32 };
        self.adapter.program(&mut self.stage, write).unwrap_or_else(|e| panic!("{:?}: {}", register, e));
    }

    fn write_table_row(&mut self, row: RowAddress, word0: u64, word1: u64) {
        let write = RawWrite::TableRow { address: row.encode(), word0, word1 };
        self.adapter.program(&mut self.stage, write).unwrap_or_else(|e| panic!("{:?}: {}", row, e));
    }

    fn address_word(&mut self, table: usize, origin: AddressOrigin, class: AddressClass, word: AddressWord, v: u32) {
        self.write_register(RegisterAddress::AddressField { table, origin, class, word }, v);
    }
}

/// Packs up to four one-byte slots into a register value, slot 0 in the low byte.
fn pack_slots<L: RegisterLayout>(slots: impl IntoIterator<Item = L>) -> u32 {
    slots
        .into_iter()
        .take(SLOTS_PER_REGISTER)
        .enumerate()
        .fold(0, |value, (i, slot)| value | (slot.pack() as u32) << (8 * i))
}

fn phv_with_words(words: &[(usize, u32)]) -> Phv {
    let mut phv = Phv::new();
    for &(n, value) in words {
        phv.set(ContainerId::word(n).unwrap(), value);
    }
    phv
}

#[test]
fn tcam_table_programmed_by_registers() {
    init();
    let mut device = Device::default();
    for byte in 0..6 {
        let select = ByteSelect { container: (byte / 4) as u8, byte: (byte % 4) as u8, enable: true };
        device.write_register(RegisterAddress::TcamXbar { byte }, select);
    }
    let unit = TcamUnitCtl { logical_table: 9, table_enable: true, key_group: 0, chain_in: false, output_enable: true };
    device.write_register(RegisterAddress::TcamUnit { row: 2, column: 1 }, unit);
    device.write_register(RegisterAddress::TableEnable { table: 9 }, true);
    device.write_register(RegisterAddress::Predication { table: 9 }, PredicationCtl { enabled: true, priority: 1 });

    let at = TcamAddress { row: 2, column: 1, index: 17 };
    let key = 0x0abc_1234_5678u64;
    let zero = TcamWord { data: !key & WORD_MASK, version: 0, valid: true };
    let one = TcamWord { data: key, version: 0, valid: true };
    device.write_table_row(RowAddress::TcamWord(at), zero.pack() as u64, one.pack() as u64);

    device.address_word(9, AddressOrigin::Tcam, AddressClass::Instruction, AddressWord::Default, 3);
    device.address_word(9, AddressOrigin::Tcam, AddressClass::Stats, AddressWord::Mask, u32::MAX);
    let set = OperationWord { valid: true, dst: 2, a_tag: 3, a: 0x2_abcd, b_tag: 3, ..Default::default() };
    device.write_table_row(RowAddress::Operation { slot: 3, op: 0 }, set.pack() as u64, 0);

    let incoming = phv_with_words(&[(0, 0x1234_5678), (1, 0x0abc)]);
    let output = device.stage.process(&incoming).unwrap();
    assert_eq!(output.tables[9].tcam_hit, Some(at));
    assert_eq!(output.tables[9].addresses.stats, at.raw());
    assert_eq!(output.phv.get(ContainerId::word(2).unwrap()), 0x2_abcd);

    let incoming = phv_with_words(&[(0, 0x1234_5679), (1, 0x0abc)]);
    assert_eq!(device.stage.process(&incoming).unwrap().phv, incoming);

    // Invalid halves clear the word.
    device.write_table_row(RowAddress::TcamWord(at), 0, 0);
    let incoming = phv_with_words(&[(0, 0x1234_5678), (1, 0x0abc)]);
    assert!(!device.stage.process(&incoming).unwrap().tables[9].hit());
}

#[test]
fn exact_table_with_action_data_programmed_by_registers() {
    init();
    let mut device = Device::default();
    for byte in 0..4 {
        let select = ByteSelect { container: 0, byte: byte as u8, enable: true };
        device.write_register(RegisterAddress::ExactXbar { byte }, select);
    }
    for bit in 0..OUTPUT_BITS {
        device.write_register(RegisterAddress::HashRow { group: 0, bit, chunk: bit / 32 }, 1u32 << (bit % 32));
    }

    let key_bytes = pack_slots((0..4).map(|byte| KeyByteSlot { byte, valid: true }));
    device.write_register(RegisterAddress::WayKeyBytes { table: 4, way: 0, part: 0 }, key_bytes);
    let rams = pack_slots([RamSlot { row: 0, column: 0, valid: true }]);
    device.write_register(RegisterAddress::WayRams { table: 4, way: 0, part: 0 }, rams);
    let way = WayCtl { enable: true, hash_group: 0, row_lsb: 0, select_lsb: 0, select_bits: 0 };
    device.write_register(RegisterAddress::WayCtl { table: 4, way: 0 }, way);

    device.write_register(RegisterAddress::RamUse { row: 0, column: 0 }, RamUseCtl { kind: 1, table: 4, vpn: 1 });
    device.write_register(RegisterAddress::NibbleEnable { row: 0, column: 0 }, 0xff_ffffu32);
    let stored = ExactRowWord { key: 0x123, byte_mask: 0b1111, vpn: 1, version: 0, valid: true }.pack();
    device.write_table_row(RowAddress::SramWord { row: 0, column: 0, word: 0x123 }, stored as u64, 0);

    device.write_register(RegisterAddress::RamUse { row: 0, column: 3 }, RamUseCtl { kind: 2, table: 4, vpn: 1 });
    device.write_table_row(RowAddress::SramWord { row: 0, column: 3, word: 0x123 }, 0xcafe_f00d, 0);
    let selector = SelectorCtl { row: 0, side: false, offset: 0, enable: true, valid: true };
    device.write_register(RegisterAddress::Crossbar { kind: mau::SelectorKind::Word, slot: 7 }, selector);

    device.address_word(4, AddressOrigin::Exact, AddressClass::ActionData, AddressWord::Mask, u32::MAX);
    device.address_word(4, AddressOrigin::Exact, AddressClass::Instruction, AddressWord::Default, 12);
    let load = OperationWord { valid: true, dst: 2, a_tag: 1, a: (2 << 5) | 7, b_tag: 3, ..Default::default() };
    device.write_table_row(RowAddress::Operation { slot: 12, op: 0 }, load.pack() as u64, 0);
    device.write_register(RegisterAddress::TableEnable { table: 4 }, true);
    device.write_register(RegisterAddress::Predication { table: 4 }, PredicationCtl { enabled: true, priority: 2 });

    let output = device.stage.process(&phv_with_words(&[(0, 0x123)])).unwrap();
    let hit = output.tables[4].exact_hit.unwrap();
    assert_eq!((hit.way, hit.row, hit.vpn), (0, 0x123, 1));
    assert_eq!(output.tables[4].action_data.map(|a| (a.ram_vpn, a.row)), Some((1, 0x123)));
    assert_eq!(output.phv.get(ContainerId::word(2).unwrap()), 0xcafe_f00d);

    let output = device.stage.process(&phv_with_words(&[(0, 0x124)])).unwrap();
    assert!(output.tables[4].exact_hit.is_none());
}

#[test]
fn rejected_writes_do_not_reach_the_stage() {
    init();
    let mut device = Device::default();
    let write = RawWrite::Register { address: 0x7f00_0000, value: 1 };
    assert_eq!(device.adapter.program(&mut device.stage, write), Err(AdapterError::UnknownAddress(0x7f00_0000)));

    // The key group fits the register field but not the stage.
    let unit =
        TcamUnitCtl { logical_table: 0, table_enable: true, key_group: 13, chain_in: false, output_enable: true };
    let address = RegisterAddress::TcamUnit { row: 0, column: 0 }.encode();
    let write = RawWrite::Register { address, value: unit.pack() as u32 };
    assert!(matches!(
        device.adapter.program(&mut device.stage, write),
        Err(AdapterError::Config(ConfigError::IndexOutOfRange { what: "tcam key group", .. }))
    ));
    assert_eq!(device.stage.config().tcam().unit_config(0, 0).map(|c| c.logical_table), Some(None));
}
