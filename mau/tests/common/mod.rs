//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use mau::constants::hash::OUTPUT_BITS;
use mau::constants::phv::CONTAINERS;
use mau::*;

/// Installs the test logger. Safe to call from every test.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Configures a stage, panicking on rejected writes.
pub fn configure(stage: &mut MauStage, units: impl IntoIterator<Item = ConfigUnit>) {
    for unit in units {
        stage.configure(unit.clone()).unwrap_or_else(|e| panic!("{:?} rejected: {}", unit, e));
    }
}

/// A header vector carrying every container with value zero.
pub fn all_zero_phv() -> Phv {
    let mut phv = Phv::new();
    for flat in 0..CONTAINERS {
        phv.set(ContainerId::from_flat(flat).unwrap(), 0);
    }
    phv
}

/// Exact crossbar bytes `4 * i .. 4 * i + 4` read 32-bit container `i`, for `i < words`.
pub fn exact_xbar_from_words(words: usize) -> Vec<ConfigUnit> {
    (0..words * 4)
        .map(|byte| {
            let container = ContainerId::word(byte / 4).unwrap();
            ConfigUnit::ExactXbarByte { byte, source: Some(ByteSource { container, byte: (byte % 4) as u8 }) }
        })
        .collect()
}

/// Ternary key group `group` reads the four bytes of 32-bit container 0 then the low two bytes of container 1.
pub fn tcam_group_from_words(group: usize) -> Vec<ConfigUnit> {
    (0..6)
        .map(|i| {
            let container = ContainerId::word(i / 4).unwrap();
            let source = Some(ByteSource { container, byte: (i % 4) as u8 });
            ConfigUnit::TcamXbarByte { byte: group * 6 + i, source }
        })
        .collect()
}

/// Hash output bit `i` of `group` copies input bit `i`.
pub fn identity_hash(group: usize) -> Vec<ConfigUnit> {
    (0..OUTPUT_BITS).map(|bit| ConfigUnit::HashCoefficient { group, bit, input_bit: bit, value: true }).collect()
}

/// Every address class of `(table, origin)` passes the raw address through and misses to
/// `table << 8 | class index`.
pub fn passthrough_addresses(table: usize, origin: AddressOrigin) -> Vec<ConfigUnit> {
    AddressClass::ALL
        .into_iter()
        .map(|class| ConfigUnit::AddressField {
            table,
            origin,
            class,
            config: AddressFieldConfig {
                shiftcount: 0,
                mask: u32::MAX,
                default_value: 0,
                miss_value: miss_value(table, class),
                vpn_shiftcount: 0,
            },
        })
        .collect()
}

/// Miss value configured by [`passthrough_addresses`].
pub fn miss_value(table: usize, class: AddressClass) -> u32 { ((table << 8) | class.index()) as u32 }

/// A single-RAM exact-match way over the first `key_bytes` crossbar bytes, indexed by hash bits `0..10`.
pub fn single_ram_way(group: usize, ram: RamId, key_bytes: usize) -> WayConfig {
    WayConfig {
        hash_group: group,
        row_lsb: 0,
        select_lsb: 0,
        select_bits: 0,
        rams: [ram].into_iter().collect(),
        key_bytes: (0..key_bytes).collect(),
    }
}

/// Header vector with the given 32-bit containers set.
pub fn phv_with_words(words: &[(usize, u32)]) -> Phv {
    let mut phv = all_zero_phv();
    for &(n, value) in words {
        phv.set(ContainerId::word(n).unwrap(), value);
    }
    phv
}
