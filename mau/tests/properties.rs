//! Properties every configuration must satisfy.

mod common;

use common::*;
use itertools::iproduct;
use mau::constants::hash::{INPUT_WORDS, OUTPUT_BITS, OUTPUT_MASK};
use mau::constants::tcam::{COLUMNS, ROWS};
use mau::*;

/// Small deterministic generator, so the properties cover many values without a seed file.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn input(&mut self) -> HashInput {
        let mut words = [0; INPUT_WORDS];
        words.iter_mut().for_each(|w| *w = self.next());
        HashInput(words)
    }
}

#[test]
fn repeated_traversals_agree() {
    init();
    let mut stage = MauStage::new();
    configure(&mut stage, tcam_group_from_words(0));
    configure(&mut stage, passthrough_addresses(1, AddressOrigin::Tcam));
    configure(&mut stage, [
        ConfigUnit::TableEnable { table: 1, enabled: true },
        ConfigUnit::TcamUnit {
            row: 0,
            column: 0,
            config: TcamUnitConfig { logical_table: Some(1), key_group: 0, chain_in: false, output_enable: true },
        },
    ]);
    for index in 0..8 {
        let at = TcamAddress { row: 0, column: 0, index };
        configure(&mut stage, [ConfigUnit::TcamEntry(TcamEntry::ternary(at, index as u64, 0b111))]);
    }

    let mut rng = XorShift(0x1234_5678);
    for _ in 0..32 {
        let phv = phv_with_words(&[(0, rng.next() as u32), (1, rng.next() as u32)]);
        let first = stage.process(&phv).unwrap();
        let second = stage.process(&phv).unwrap();
        assert_eq!(first.tables, second.tables);
        assert_eq!(first.phv, second.phv);
        let low_bits = phv.get(ContainerId::word(0).unwrap()) & 7;
        assert_eq!(first.tables[1].tcam_hit.map(|a| a.index as u32), Some(low_bits));
    }
}

#[test]
fn lexicographically_first_tcam_word_wins() {
    init();
    let units = iproduct!(0..ROWS, 0..COLUMNS).collect::<Vec<_>>();
    for (i, &first) in units.iter().enumerate() {
        for &second in &units[i + 1..] {
            let mut stage = MauStage::new();
            configure(&mut stage, tcam_group_from_words(0));
            configure(&mut stage, [ConfigUnit::TableEnable { table: 0, enabled: true }]);
            for (row, column) in [second, first] {
                let config =
                    TcamUnitConfig { logical_table: Some(0), key_group: 0, chain_in: false, output_enable: true };
                let at = TcamAddress { row, column, index: 100 };
                configure(&mut stage, [
                    ConfigUnit::TcamUnit { row, column, config },
                    ConfigUnit::TcamEntry(TcamEntry::ternary(at, 0, 0)),
                ]);
            }
            let output = stage.process(&all_zero_phv()).unwrap();
            let expected = TcamAddress { row: first.0, column: first.1, index: 100 };
            assert_eq!(output.tables[0].tcam_hit, Some(expected));
        }
    }
}

#[test]
fn hash_is_linear() {
    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    let mut matrix = HashMatrix::default();
    for group in [0, 7] {
        for bit in 0..OUTPUT_BITS {
            matrix.set_row(group, bit, rng.input().0).unwrap();
        }
        matrix.set_seed(group, rng.next() & OUTPUT_MASK).unwrap();
    }
    matrix.set_parity_group_mask(7, 0x0f0f).unwrap();

    for group in [0, 7] {
        let hash = |input: &HashInput| matrix.hash(group, input).unwrap();
        let zero = hash(&HashInput::default());
        assert_eq!(Some(zero), matrix.seed(group));
        for _ in 0..64 {
            let a = rng.input();
            let b = rng.input();
            assert_eq!(hash(&a.xor(&b)), hash(&a) ^ hash(&b) ^ zero);
        }
    }
}

#[test]
fn address_derivation_is_idempotent() {
    let mut rng = XorShift(42);
    for _ in 0..256 {
        let field = AddressFieldConfig {
            shiftcount: (rng.next() % 40) as u8,
            mask: rng.next() as u32,
            default_value: rng.next() as u32,
            miss_value: rng.next() as u32,
            vpn_shiftcount: 0,
        };
        let raw = rng.next() as u32;
        assert_eq!(field.derive(Some(raw)), field.derive(Some(raw)));
        assert_eq!(field.derive(None), field.miss_value);

        let masked = AddressFieldConfig { mask: 0, ..field };
        assert_eq!(masked.derive(Some(raw)), field.default_value);
        assert_eq!(masked.derive(None), field.miss_value);
    }
}

#[test]
fn crossbar_routing_is_total() {
    let mut rng = XorShift(7);
    let kinds = [SelectorKind::Byte, SelectorKind::Half, SelectorKind::Word];
    let mut xbar = CrossbarConfig::default();
    for kind in kinds {
        for slot in (0..kind.slots()).step_by(3) {
            let side = if rng.next() % 2 == 0 { Side::Left } else { Side::Right };
            let source = RowSide { row: (rng.next() % 8) as usize, side };
            let offset = (rng.next() as usize) % kind.offsets();
            let enable = rng.next() % 4 != 0;
            xbar.ctl(kind, slot, Some(Selector { source, offset, enable })).unwrap();
        }
    }

    let mut buses = HomeBuses::default();
    for row in 0..8 {
        let word = (u128::from(rng.next()) << 64) | u128::from(rng.next());
        buses.drive(RowSide { row, side: Side::Left }, 0, word);
    }

    let adb = xbar.route(&buses);
    for kind in kinds {
        for slot in 0..kind.slots() {
            let value = adb.get(kind, slot);
            assert_eq!(value, xbar.route(&buses).get(kind, slot));
            match xbar.selector(kind, slot) {
                Some(Selector { source, offset, enable: true }) => {
                    let expected = extract_u128(buses.word(source), offset * kind.bits(), kind.bits()) as u32;
                    assert_eq!(value, expected);
                }
                _ => assert_eq!(value, 0),
            }
            assert!(u64::from(value) <= low_mask(kind.bits()));
        }
    }
}
