use serde::Deserialize;
use types::phase0::{
    containers::Checkpoint,
    primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
};

/// The block the store is initialized from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorBlock {
    pub root: H256,
    pub slot: Slot,
}

/// The parts of the anchor state that fork choice needs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorState {
    pub genesis_time: UnixSeconds,
    pub slot: Slot,
    pub latest_block_root: H256,
    pub total_active_balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockSummary {
    pub root: H256,
    pub parent_root: H256,
    pub slot: Slot,
}

/// Output of the state transition for a block.
///
/// Fork choice does not run the state transition itself.
/// Callers are expected to have verified the block before passing this in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostStateSummary {
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub total_active_balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vote {
    pub validator_index: ValidatorIndex,
    pub block_root: H256,
    pub target_epoch: Epoch,
    pub balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    pub root: H256,
    pub balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HeadBlock {
    pub root: H256,
    pub slot: Slot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HeadChange {
    CanonicalChainExtended,
    AlternateChainExtended,
    Reorganized { old_head: HeadBlock },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ApplyBlockChanges {
    pub head: HeadChange,
    pub finalized_checkpoint_updated: bool,
    /// Justified checkpoint from the block's post-state that has the same epoch as a checkpoint
    /// already in the store but a different root.
    pub conflicting_justified_checkpoint: Option<Checkpoint>,
}

impl ApplyBlockChanges {
    #[must_use]
    pub const fn is_reorganized(&self) -> bool {
        matches!(self.head, HeadChange::Reorganized { .. })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyTickChanges {
    TickUpdated,
    SlotUpdated { justified_checkpoint_updated: bool },
}

impl ApplyTickChanges {
    #[must_use]
    pub const fn is_justified_checkpoint_updated(self) -> bool {
        match self {
            Self::TickUpdated => false,
            Self::SlotUpdated {
                justified_checkpoint_updated,
            } => justified_checkpoint_updated,
        }
    }
}
