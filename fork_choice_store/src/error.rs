use thiserror::Error;
use types::phase0::primitives::{Gwei, Slot, UnixSeconds, H256};

use crate::misc::{AnchorBlock, AnchorState};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "anchor state does not match anchor block \
         (anchor_block: {anchor_block:?}, anchor_state: {anchor_state:?})"
    )]
    AnchorMismatch {
        anchor_block: AnchorBlock,
        anchor_state: AnchorState,
    },
    #[error("anchor block is not at the start of an epoch: {anchor_block:?}")]
    AnchorNotAtEpochStart { anchor_block: AnchorBlock },
    #[error(
        "start of anchor slot does not fit in UnixSeconds \
         (anchor_block: {anchor_block:?}, genesis_time: {genesis_time})"
    )]
    AnchorTimeOverflow {
        anchor_block: AnchorBlock,
        genesis_time: UnixSeconds,
    },
    #[error(
        "block slot is earlier than that of its parent \
         (block_root: {block_root:?}, slot: {slot}, parent_slot: {parent_slot})"
    )]
    BlockSlotBeforeParent {
        block_root: H256,
        slot: Slot,
        parent_slot: Slot,
    },
    #[error("tick moves time backwards (store_time: {store_time}, tick_time: {tick_time})")]
    InvalidTick {
        store_time: UnixSeconds,
        tick_time: UnixSeconds,
    },
    #[error("finalized block is not in the block tree: {finalized_root:?}")]
    PruneError { finalized_root: H256 },
    #[error(
        "parent block is not in the block tree \
         (block_root: {block_root:?}, parent_root: {parent_root:?})"
    )]
    UnknownParent { block_root: H256, parent_root: H256 },
    #[error(
        "adding weight would overflow \
         (block_root: {block_root:?}, weight: {weight}, amount: {amount})"
    )]
    WeightOverflow {
        block_root: H256,
        weight: Gwei,
        amount: Gwei,
    },
    #[error(
        "removing weight would make it negative \
         (block_root: {block_root:?}, weight: {weight}, amount: {amount})"
    )]
    WeightUnderflow {
        block_root: H256,
        weight: Gwei,
        amount: Gwei,
    },
}

impl Error {
    /// Returns `true` for errors caused by input that may become valid later.
    ///
    /// Blocks rejected with [`Error::UnknownParent`] should be retried once the parent is applied.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownParent { .. })
    }
}
