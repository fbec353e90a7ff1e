use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::phase0::primitives::{Epoch, H256};

// The derived `Ord` compares epochs first and roots second.
// Fork choice only ever compares epochs. Roots are compared for equality.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Display, Deserialize, Serialize,
)]
#[display("{epoch}/{root:?}")]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

impl Checkpoint {
    /// Returns `true` for the checkpoint stored in genesis states, which has its root set to
    /// 0x00…00.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::default()
    }

    #[must_use]
    pub fn conflicts_with(self, other: Self) -> bool {
        self.epoch == other.epoch && self.root != other.root
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn checkpoint_is_deserialized_from_consensus_spec_tests_format() {
        let yaml = "
            epoch: 3
            root: '0x0101010101010101010101010101010101010101010101010101010101010101'
        ";

        let checkpoint = serde_yaml::from_str::<Checkpoint>(yaml)
            .expect("YAML should contain a valid checkpoint");

        assert_eq!(
            checkpoint,
            Checkpoint {
                epoch: 3,
                root: H256(hex!(
                    "0101010101010101010101010101010101010101010101010101010101010101"
                )),
            },
        );
    }

    #[test]
    fn checkpoint_with_unknown_fields_is_rejected() {
        let yaml = "
            epoch: 3
            root: '0x0101010101010101010101010101010101010101010101010101010101010101'
            slot: 5
        ";

        assert!(serde_yaml::from_str::<Checkpoint>(yaml).is_err());
    }

    #[test]
    fn checkpoints_are_ordered_by_epoch_then_root() {
        let low_root = H256::repeat_byte(1);
        let high_root = H256::repeat_byte(2);

        let earlier = Checkpoint {
            epoch: 1,
            root: high_root,
        };

        let later = Checkpoint {
            epoch: 2,
            root: low_root,
        };

        let later_with_higher_root = Checkpoint {
            epoch: 2,
            root: high_root,
        };

        assert!(earlier < later);
        assert!(later < later_with_higher_root);
    }

    #[test]
    fn conflicting_checkpoints_share_an_epoch() {
        let checkpoint = Checkpoint {
            epoch: 2,
            root: H256::repeat_byte(1),
        };

        let same_epoch = Checkpoint {
            root: H256::repeat_byte(2),
            ..checkpoint
        };

        let other_epoch = Checkpoint {
            epoch: 3,
            ..same_epoch
        };

        assert!(checkpoint.conflicts_with(same_epoch));
        assert!(!checkpoint.conflicts_with(checkpoint));
        assert!(!checkpoint.conflicts_with(other_epoch));
        assert!(Checkpoint::default().is_zero());
        assert!(!checkpoint.is_zero());
    }
}
