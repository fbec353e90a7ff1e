use core::num::NonZeroU64;
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{phase0::primitives::Gwei, preset::PresetName};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/v1.1.0/configs).
/// Unknown keys are ignored so that full network configuration files can be loaded as is.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants. It is intended to be deserialized from user input. \
              The `unsafe` block in `nonzero!` only operates on the literal passed to it."
)]
#[expect(
    clippy::struct_field_names,
    reason = "struct_field_name is allowed to have config_name, as it starts with the same name as struct"
)]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Time parameters
    pub seconds_per_slot: NonZeroU64,

    // Fork choice
    pub proposer_score_boost: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    /// [Mainnet configuration](https://github.com/ethereum/consensus-specs/blob/v1.1.0/configs/mainnet.yaml).
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            preset_base: PresetName::Mainnet,
            seconds_per_slot: nonzero!(12_u64),
            proposer_score_boost: 40,
        }
    }

    /// [Minimal configuration](https://github.com/ethereum/consensus-specs/blob/v1.1.0/configs/minimal.yaml).
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,
            seconds_per_slot: nonzero!(6_u64),
            proposer_score_boost: 40,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.config_name.is_empty() {
            return Err(Error::NameEmpty);
        }

        for character in self.config_name.chars() {
            if !matches!(character, 'a'..='z' | '0'..='9' | '-') {
                return Err(Error::NameContainsIllegalCharacters);
            }
        }

        if self.proposer_score_boost > 100 {
            return Err(Error::ProposerScoreBoostTooLarge {
                proposer_score_boost: self.proposer_score_boost,
            });
        }

        Ok(())
    }

    /// Share of a committee's weight given to a timely block, as in
    /// [`get_latest_attesting_balance`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_latest_attesting_balance).
    #[must_use]
    pub const fn proposer_score(
        &self,
        total_active_balance: Gwei,
        slots_per_epoch: NonZeroU64,
    ) -> Gwei {
        let committee_weight = total_active_balance / slots_per_epoch.get();
        committee_weight.saturating_mul(self.proposer_score_boost) / 100
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration name is empty")]
    NameEmpty,
    #[error("configuration name contains illegal characters")]
    NameContainsIllegalCharacters,
    #[error("PROPOSER_SCORE_BOOST is a percentage but was set to {proposer_score_boost}")]
    ProposerScoreBoostTooLarge { proposer_score_boost: u64 },
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Refactoring worsens readability, which is more important in tests."
)]
#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Config::mainnet())]
    #[test_case(Config::minimal())]
    fn config_is_valid(config: Config) -> Result<(), Error> {
        config.validate()
    }

    #[test]
    fn config_is_deserialized_with_defaults_for_missing_keys() -> Result<(), serde_yaml::Error> {
        let yaml = "
            CONFIG_NAME: custom-devnet
            PRESET_BASE: minimal
            SECONDS_PER_SLOT: 2
            DEPOSIT_CHAIN_ID: 1
        ";

        let config = serde_yaml::from_str::<Config>(yaml)?;

        assert_eq!(config.config_name, "custom-devnet");
        assert_eq!(config.preset_base, PresetName::Minimal);
        assert_eq!(config.seconds_per_slot.get(), 2);
        assert_eq!(config.proposer_score_boost, 40);

        Ok(())
    }

    #[test_case("", false)]
    #[test_case("Mainnet", false)]
    #[test_case("my-devnet-1", true)]
    fn config_name_is_validated(name: &'static str, valid: bool) {
        let config = Config {
            config_name: Cow::Borrowed(name),
            ..Config::mainnet()
        };

        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn proposer_score_boost_over_100_is_rejected() {
        let config = Config {
            proposer_score_boost: 101,
            ..Config::minimal()
        };

        assert!(matches!(
            config.validate(),
            Err(Error::ProposerScoreBoostTooLarge {
                proposer_score_boost: 101,
            }),
        ));
    }

    #[test_case(32 * 32_000_000_000, 32, 12_800_000_000)]
    #[test_case(8 * 64, 8, 25)]
    #[test_case(0, 8, 0)]
    fn proposer_score_is_a_fraction_of_committee_weight(
        total_active_balance: Gwei,
        slots_per_epoch: u64,
        expected: Gwei,
    ) {
        let slots_per_epoch = NonZeroU64::new(slots_per_epoch).expect("test slot counts are not 0");

        assert_eq!(
            Config::mainnet().proposer_score(total_active_balance, slots_per_epoch),
            expected,
        );
    }
}
