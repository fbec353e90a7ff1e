use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use typenum::{NonZero, Unsigned, U2, U32, U8};

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/v1.1.0/presets).
/// Only the variables used by fork choice are included.
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    type SlotsPerEpoch: Unsigned + NonZero;
    type SafeSlotsToUpdateJustified: Unsigned;

    const NAME: PresetName;

    // `NonZero` rules out the panic, but the compiler cannot see through the bound.
    const SLOTS_PER_EPOCH: NonZeroU64 = match NonZeroU64::new(Self::SlotsPerEpoch::U64) {
        Some(slots_per_epoch) => slots_per_epoch,
        None => panic!("SlotsPerEpoch is bounded by NonZero"),
    };
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Display, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    #[default]
    #[display("mainnet")]
    Mainnet,
    #[display("minimal")]
    Minimal,
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/v1.1.0/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    type SlotsPerEpoch = U32;
    type SafeSlotsToUpdateJustified = U8;

    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/v1.1.0/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    type SlotsPerEpoch = U8;
    type SafeSlotsToUpdateJustified = U2;

    const NAME: PresetName = PresetName::Minimal;
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Mainnet::SLOTS_PER_EPOCH, 32)]
    #[test_case(Minimal::SLOTS_PER_EPOCH, 8)]
    fn slots_per_epoch_matches_type_level_value(actual: NonZeroU64, expected: u64) {
        assert_eq!(actual.get(), expected);
    }

    #[test]
    fn safe_slots_to_update_justified_is_shorter_than_an_epoch() {
        assert!(
            <Mainnet as Preset>::SafeSlotsToUpdateJustified::U64
                < <Mainnet as Preset>::SlotsPerEpoch::U64
        );
        assert!(
            <Minimal as Preset>::SafeSlotsToUpdateJustified::U64
                < <Minimal as Preset>::SlotsPerEpoch::U64
        );
    }

    #[test]
    fn preset_names_are_serialized_in_lowercase() {
        assert_eq!(Mainnet::NAME.to_string(), "mainnet");
        assert_eq!(Minimal::NAME.to_string(), "minimal");
        assert_eq!(
            serde_yaml::from_str::<PresetName>("minimal").ok(),
            Some(PresetName::Minimal),
        );
    }
}
