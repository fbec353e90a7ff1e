use std::sync::Arc;

use fork_choice_store::{HeadBlock, LatestMessage, Store};
use types::{
    phase0::{
        containers::Checkpoint,
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::controller::Controller;

// Every method here loads the snapshot separately.
// Use `Controller::snapshot` to read multiple values from the same version of the store.
impl<P: Preset> Controller<P> {
    #[must_use]
    pub fn head(&self) -> HeadBlock {
        self.store_snapshot().head()
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.head().root
    }

    #[must_use]
    pub fn head_slot(&self) -> Slot {
        self.head().slot
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().justified_checkpoint()
    }

    #[must_use]
    pub fn best_justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().best_justified_checkpoint()
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().finalized_checkpoint()
    }

    #[must_use]
    pub fn store_time(&self) -> UnixSeconds {
        self.store_snapshot().time()
    }

    #[must_use]
    pub fn genesis_time(&self) -> UnixSeconds {
        self.store_snapshot().genesis_time()
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.store_snapshot().current_slot()
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.store_snapshot().current_epoch()
    }

    /// Returns `H256::zero()` if no block has been boosted in the current slot.
    #[must_use]
    pub fn proposer_boost_root(&self) -> H256 {
        self.store_snapshot().proposer_boost_root()
    }

    #[must_use]
    pub fn proposer_score(&self) -> Gwei {
        self.store_snapshot().proposer_score()
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.store_snapshot().block_tree().contains(block_root)
    }

    #[must_use]
    pub fn block_weight(&self, block_root: H256) -> Option<Gwei> {
        self.store_snapshot()
            .block_tree()
            .node(block_root)
            .map(|node| node.weight)
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.store_snapshot().latest_message(validator_index)
    }

    /// Returns the latest published version of the store.
    ///
    /// The returned `Store` is not affected by later mutations.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Store<P>> {
        self.owned_store_snapshot()
    }
}
