//! Address distribution.
//!
//! Every logical table turns its raw match address into one derived address per [`AddressClass`]. On a hit the
//! derived address is `((raw >> shiftcount) & mask) | default_value`; on a miss it is the configured
//! `miss_value`. Configurations are kept per `(table, origin)` since the exact and the ternary result buses of a
//! table are configured independently.

use std::fmt;

use crate::config::ConfigError;
use crate::constants::sram::{ROW_ADDRESS_BITS, WORD_BITS};
use crate::constants::table::*;
use crate::utils::{extract_u128, shr_or_zero};

/// Number of address classes.
pub const ADDRESS_CLASSES: usize = 6;

macro_rules! address_classes {
    ($($name:ident),* $(,)?) => {
        ::paste::paste! {
            /// Class of a derived address.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub enum AddressClass {
                $(
                    #[doc = "The `" $name "` address."]
                    [<$name:camel>],
                )*
            }

            impl AddressClass {
                /// Every class, in derivation order.
                pub const ALL: [Self; ADDRESS_CLASSES] = [$(Self::[<$name:camel>]),*];

                /// Position in [`AddressClass::ALL`].
                pub fn index(self) -> usize { self as usize }

                fn name(self) -> &'static str {
                    match self {
                        $(Self::[<$name:camel>] => stringify!($name),)*
                    }
                }
            }

            /// Addresses derived for one logical table.
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct DerivedAddresses {
                $(
                    #[doc = "The `" $name "` address."]
                    pub $name: u32,
                )*
            }

            impl DerivedAddresses {
                /// Address of a class.
                pub fn get(&self, class: AddressClass) -> u32 {
                    match class {
                        $(AddressClass::[<$name:camel>] => self.$name,)*
                    }
                }

                /// Sets the address of a class.
                pub fn set(&mut self, class: AddressClass, value: u32) {
                    match class {
                        $(AddressClass::[<$name:camel>] => self.$name = value,)*
                    }
                }
            }
        }
    };
}

address_classes!(instruction, immediate_data, action_data, stats, meter, idle_time);

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Matcher whose raw address feeds the derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressOrigin {
    /// Exact-match engine.
    Exact,
    /// Ternary matcher.
    Tcam,
}

impl AddressOrigin {
    fn index(self) -> usize {
        match self {
            Self::Exact => 0,
            Self::Tcam => 1,
        }
    }
}

/// Result bus of a logical table. Two tables share one physical row, one per half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResultBus {
    /// Physical row.
    pub row: usize,
    /// Half of the row.
    pub half: usize,
}

impl ResultBus {
    /// Result bus of a table.
    pub fn of(table: usize) -> Self { Self { row: table / 2, half: table % 2 } }

    /// Table driving the bus.
    pub fn table(self) -> usize { self.row * 2 + self.half }
}

/// Derivation of one address class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressFieldConfig {
    /// Right shift applied to the raw address.
    pub shiftcount: u8,
    /// Mask applied after the shift.
    pub mask: u32,
    /// ORed into the address on a hit.
    pub default_value: u32,
    /// Address on a miss.
    pub miss_value: u32,
    /// Action-data only: `log2` of the logical VPNs packed into one physical RAM.
    pub vpn_shiftcount: u8,
}

impl AddressFieldConfig {
    /// Address derived from a hit.
    pub fn hit(&self, raw: u32) -> u32 {
        (shr_or_zero(raw, u32::from(self.shiftcount)) & self.mask) | self.default_value
    }

    /// Address derived from a match result.
    pub fn derive(&self, raw: Option<u32>) -> u32 {
        match raw {
            Some(raw) => self.hit(raw),
            None => self.miss_value,
        }
    }

    /// Whether the shift pushes every raw bit out of the address.
    pub fn shift_out_of_range(&self) -> bool { usize::from(self.shiftcount) >= ADDRESS_BITS }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if self.vpn_shiftcount > MAX_VPN_SHIFT {
            return Err(ConfigError::VpnShiftOutOfRange { vpn_shiftcount: self.vpn_shiftcount, limit: MAX_VPN_SHIFT });
        }
        Ok(())
    }
}

/// Derivation of every address class for one `(table, origin)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableAddressConfig {
    fields: [AddressFieldConfig; ADDRESS_CLASSES],
}

impl TableAddressConfig {
    /// Derivation of a class.
    pub fn field(&self, class: AddressClass) -> &AddressFieldConfig { &self.fields[class.index()] }

    /// Mutable derivation of a class.
    pub fn field_mut(&mut self, class: AddressClass) -> &mut AddressFieldConfig { &mut self.fields[class.index()] }

    /// Derives every address class.
    pub fn derive(&self, raw: Option<u32>) -> DerivedAddresses {
        let mut derived = DerivedAddresses::default();
        for class in AddressClass::ALL {
            derived.set(class, self.field(class).derive(raw));
        }
        derived
    }
}

/// Physical location of a table's action data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDataAddress {
    /// VPN of the physical RAM holding the data.
    pub ram_vpn: u32,
    /// Word inside the RAM.
    pub row: usize,
    /// Lane of the word.
    pub lane: u32,
    /// Bits per lane.
    pub lane_bits: u32,
}

impl ActionDataAddress {
    /// Splits a derived action-data address.
    ///
    /// The low [`ROW_ADDRESS_BITS`] bits are the word, the rest is the logical VPN. `2^vpn_shiftcount` logical
    /// VPNs share one physical RAM, each owning one lane of `128 >> vpn_shiftcount` bits.
    pub fn new(derived: u32, vpn_shiftcount: u8) -> Self {
        let vpn = derived >> ROW_ADDRESS_BITS;
        let shift = u32::from(vpn_shiftcount.min(MAX_VPN_SHIFT));
        Self {
            ram_vpn: vpn >> shift,
            row: (derived as usize) & ((1 << ROW_ADDRESS_BITS) - 1),
            lane: vpn & ((1 << shift) - 1),
            lane_bits: (WORD_BITS as u32) >> shift,
        }
    }

    /// Extracts the lane from a RAM word, right-aligned.
    pub fn extract(&self, word: u128) -> u128 {
        extract_u128(word, (self.lane * self.lane_bits) as usize, self.lane_bits as usize)
    }
}

/// Address-distribution configuration of every logical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDistribution {
    tables: [[TableAddressConfig; 2]; LOGICAL_TABLES],
}

fn check_table(table: usize) -> Result<(), ConfigError> {
    if table < LOGICAL_TABLES {
        Ok(())
    } else {
        Err(ConfigError::IndexOutOfRange { what: "logical table", index: table, limit: LOGICAL_TABLES })
    }
}

impl AddressDistribution {
    /// Sets the derivation of one class.
    pub fn set_field(
        &mut self, table: usize, origin: AddressOrigin, class: AddressClass, config: AddressFieldConfig,
    ) -> Result<(), ConfigError> {
        check_table(table)?;
        config.check()?;
        *self.tables[table][origin.index()].field_mut(class) = config;
        Ok(())
    }

    /// Configuration of `(table, origin)`.
    pub fn config(&self, table: usize, origin: AddressOrigin) -> Option<&TableAddressConfig> {
        self.tables.get(table).map(|configs| &configs[origin.index()])
    }

    /// Derives every address class of a table.
    pub fn derive(&self, table: usize, origin: AddressOrigin, raw: Option<u32>) -> Option<DerivedAddresses> {
        Some(self.config(table, origin)?.derive(raw))
    }

    /// Physical action-data location of a derived address set.
    pub fn action_data(
        &self, table: usize, origin: AddressOrigin, derived: &DerivedAddresses,
    ) -> Option<ActionDataAddress> {
        let vpn_shiftcount = self.config(table, origin)?.field(AddressClass::ActionData).vpn_shiftcount;
        Some(ActionDataAddress::new(derived.action_data, vpn_shiftcount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let field = AddressFieldConfig {
            shiftcount: 4,
            mask: 0xff,
            default_value: 0x1000,
            miss_value: 0x77,
            vpn_shiftcount: 0,
        };
        assert_eq!(field.derive(Some(0xabcd)), 0x10bc);
        assert_eq!(field.derive(None), 0x77);
        assert_eq!(field.derive(Some(0xabcd)), field.derive(Some(0xabcd)));
    }

    #[test]
    fn zero_mask_gives_default() {
        let field =
            AddressFieldConfig { shiftcount: 3, mask: 0, default_value: 0x42, miss_value: 0x24, vpn_shiftcount: 0 };
        for raw in [0, 1, 0xffff_ffff, 0x1234_5678] {
            assert_eq!(field.derive(Some(raw)), 0x42);
        }
        assert_eq!(field.derive(None), 0x24);
    }

    #[test]
    fn oversized_shift_reads_zero() {
        let field = AddressFieldConfig { shiftcount: 32, mask: u32::MAX, default_value: 5, ..Default::default() };
        assert!(field.shift_out_of_range());
        assert_eq!(field.derive(Some(u32::MAX)), 5);
        let field = AddressFieldConfig { shiftcount: 200, ..field };
        assert_eq!(field.derive(Some(u32::MAX)), 5);
    }

    #[test]
    fn class_accessors() {
        let mut derived = DerivedAddresses::default();
        for (i, class) in AddressClass::ALL.into_iter().enumerate() {
            assert_eq!(class.index(), i);
            derived.set(class, i as u32 + 1);
        }
        assert_eq!(derived.instruction, 1);
        assert_eq!(derived.idle_time, 6);
        assert_eq!(derived.get(AddressClass::Meter), 5);
        assert_eq!(AddressClass::ImmediateData.to_string(), "immediate_data");
    }

    #[test]
    fn action_data_lanes() {
        let plain = ActionDataAddress::new((5 << 10) | 17, 0);
        assert_eq!(plain, ActionDataAddress { ram_vpn: 5, row: 17, lane: 0, lane_bits: 128 });
        assert_eq!(plain.extract(u128::MAX), u128::MAX);

        let quarter = ActionDataAddress::new((7 << 10) | 3, 2);
        assert_eq!(quarter, ActionDataAddress { ram_vpn: 1, row: 3, lane: 3, lane_bits: 32 });
        assert_eq!(quarter.extract(0xdead_beef << 96), 0xdead_beef);
    }

    #[test]
    fn vpn_shift_is_checked() {
        let mut adist = AddressDistribution::default();
        let field = AddressFieldConfig { vpn_shiftcount: 5, ..Default::default() };
        assert!(adist.set_field(0, AddressOrigin::Exact, AddressClass::ActionData, field).is_err());
        assert!(adist.set_field(16, AddressOrigin::Exact, AddressClass::Stats, Default::default()).is_err());
    }

    #[test]
    fn origins_are_independent() {
        let mut adist = AddressDistribution::default();
        let exact = AddressFieldConfig { mask: u32::MAX, ..Default::default() };
        let tcam = AddressFieldConfig { mask: 0, default_value: 9, ..Default::default() };
        adist.set_field(3, AddressOrigin::Exact, AddressClass::Stats, exact).unwrap();
        adist.set_field(3, AddressOrigin::Tcam, AddressClass::Stats, tcam).unwrap();
        assert_eq!(adist.derive(3, AddressOrigin::Exact, Some(100)).unwrap().stats, 100);
        assert_eq!(adist.derive(3, AddressOrigin::Tcam, Some(100)).unwrap().stats, 9);
        assert_eq!(adist.derive(LOGICAL_TABLES, AddressOrigin::Tcam, Some(100)), None);
        assert!(adist.config(LOGICAL_TABLES, AddressOrigin::Exact).is_none());
        assert_eq!(ResultBus::of(3), ResultBus { row: 1, half: 1 });
        assert_eq!(ResultBus::of(3).table(), 3);
    }
}
