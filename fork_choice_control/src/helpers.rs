use std::sync::Arc;

use anyhow::Result;
use fork_choice_store::{
    AnchorBlock, AnchorState, ApplyBlockChanges, BlockSummary, PostStateSummary, Vote,
};
use helper_functions::misc;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        containers::Checkpoint,
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::{Minimal, Preset},
};

use crate::controller::Controller;

pub const GENESIS_TIME: UnixSeconds = 1_000;

// With `Config::minimal` this yields a proposer score of 40.
pub const TOTAL_ACTIVE_BALANCE: Gwei = 800;

/// A block together with the parts of its post-state that fork choice needs.
#[derive(Clone, Copy, Debug)]
pub struct TestBlock {
    pub summary: BlockSummary,
    pub post_state: PostStateSummary,
}

impl TestBlock {
    #[must_use]
    pub const fn root(&self) -> H256 {
        self.summary.root
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.summary.slot
    }

    // The `root` parameters are needed for two reasons:
    // - To make otherwise identical blocks distinct.
    // - To break ties the desired way.

    /// Creates a child that inherits the checkpoints of `self`.
    #[must_use]
    pub const fn child(&self, slot: Slot, root: H256) -> Self {
        Self {
            summary: BlockSummary {
                root,
                parent_root: self.summary.root,
                slot,
            },
            post_state: self.post_state,
        }
    }

    #[must_use]
    pub const fn justifying(mut self, checkpoint: Checkpoint) -> Self {
        self.post_state.current_justified_checkpoint = checkpoint;
        self
    }

    #[must_use]
    pub const fn finalizing(mut self, checkpoint: Checkpoint) -> Self {
        self.post_state.finalized_checkpoint = checkpoint;
        self
    }

    /// Returns a checkpoint for `self` assuming it is the first block of `epoch`.
    #[must_use]
    pub const fn checkpoint(&self, epoch: Epoch) -> Checkpoint {
        Checkpoint {
            epoch,
            root: self.summary.root,
        }
    }
}

pub struct Context<P: Preset> {
    controller: Controller<P>,
    config: Arc<Config>,
    genesis_block: TestBlock,
}

impl Context<Minimal> {
    #[must_use]
    pub fn minimal() -> Self {
        Self::new(Arc::new(Config::minimal()))
    }
}

impl<P: Preset> Context<P> {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let anchor_block = AnchorBlock {
            root: genesis_root(),
            slot: GENESIS_SLOT,
        };

        let anchor_state = AnchorState {
            genesis_time: GENESIS_TIME,
            slot: GENESIS_SLOT,
            latest_block_root: genesis_root(),
            total_active_balance: TOTAL_ACTIVE_BALANCE,
        };

        Self::with_anchor(config, anchor_block, anchor_state)
    }

    #[must_use]
    pub fn with_anchor(
        config: Arc<Config>,
        anchor_block: AnchorBlock,
        anchor_state: AnchorState,
    ) -> Self {
        let anchor_checkpoint = Checkpoint {
            epoch: misc::compute_epoch_at_slot::<P>(anchor_block.slot),
            root: anchor_block.root,
        };

        let genesis_block = TestBlock {
            summary: BlockSummary {
                root: anchor_block.root,
                parent_root: H256::zero(),
                slot: anchor_block.slot,
            },
            post_state: PostStateSummary {
                current_justified_checkpoint: anchor_checkpoint,
                finalized_checkpoint: anchor_checkpoint,
                total_active_balance: anchor_state.total_active_balance,
            },
        };

        let controller = Controller::new(Arc::clone(&config), anchor_block, anchor_state)
            .expect("anchor should be valid");

        Self {
            controller,
            config,
            genesis_block,
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &Controller<P> {
        &self.controller
    }

    #[must_use]
    pub const fn genesis_block(&self) -> TestBlock {
        self.genesis_block
    }

    #[must_use]
    pub const fn genesis_checkpoint(&self) -> Checkpoint {
        self.genesis_block.post_state.finalized_checkpoint
    }

    pub fn on_tick(&self, time: UnixSeconds) {
        self.controller
            .on_tick(time)
            .expect("time should not go backwards");
    }

    pub fn on_slot(&self, slot: Slot) {
        let genesis_time = self.controller.genesis_time();

        let time = misc::compute_time_at_slot(&self.config, genesis_time, slot)
            .expect("slots used in tests start at representable times");

        self.on_tick(time);

        assert_eq!(self.controller.slot(), slot);
    }

    // Moves to the attesting interval of `slot`, where new blocks are no longer timely.
    pub fn on_late_slot(&self, slot: Slot) {
        let genesis_time = self.controller.genesis_time();
        let time = misc::compute_time_at_slot(&self.config, genesis_time, slot)
            .expect("slots used in tests start at representable times")
            + self.config.seconds_per_slot.get() / 2;

        self.on_tick(time);

        assert_eq!(self.controller.slot(), slot);
    }

    pub fn on_block(&self, block: TestBlock) -> ApplyBlockChanges {
        self.try_on_block(block)
            .expect("block should be valid")
            .expect("block should be new")
    }

    pub fn try_on_block(&self, block: TestBlock) -> Result<Option<ApplyBlockChanges>> {
        self.controller.on_block(block.summary, block.post_state)
    }

    pub fn on_attestation(&self, block: TestBlock, delta: i64) {
        let applied = self
            .controller
            .on_attestation(block.root(), delta)
            .expect("weight should stay in range");

        assert!(applied);
    }

    pub fn on_vote(
        &self,
        validator_index: ValidatorIndex,
        block: TestBlock,
        target_epoch: Epoch,
        balance: Gwei,
    ) -> bool {
        self.controller
            .on_vote(Vote {
                validator_index,
                block_root: block.root(),
                target_epoch,
                balance,
            })
            .expect("weight should stay in range")
    }

    pub fn assert_time(&self, expected_time: UnixSeconds) {
        assert_eq!(self.controller.store_time(), expected_time);
    }

    pub fn assert_genesis_time(&self, expected_time: UnixSeconds) {
        assert_eq!(self.controller.genesis_time(), expected_time);
    }

    pub fn assert_justified_checkpoint(&self, expected_checkpoint: Checkpoint) {
        assert_eq!(self.controller.justified_checkpoint(), expected_checkpoint);
    }

    pub fn assert_best_justified_checkpoint(&self, expected_checkpoint: Checkpoint) {
        assert_eq!(
            self.controller.best_justified_checkpoint(),
            expected_checkpoint,
        );
    }

    pub fn assert_finalized_checkpoint(&self, expected_checkpoint: Checkpoint) {
        assert_eq!(self.controller.finalized_checkpoint(), expected_checkpoint);
    }

    pub fn assert_proposer_boost_root(&self, expected_root: H256) {
        assert_eq!(self.controller.proposer_boost_root(), expected_root);
    }

    pub fn assert_head(&self, expected_head_slot: Slot, expected_head_root: H256) {
        let head = self.controller.head();

        assert_eq!(head.root, expected_head_root);
        assert_eq!(head.slot, expected_head_slot);
    }

    pub fn assert_head_block(&self, expected_head: TestBlock) {
        self.assert_head(expected_head.slot(), expected_head.root());
    }
}

#[must_use]
pub fn genesis_root() -> H256 {
    H256::repeat_byte(0xaa)
}

#[must_use]
pub fn root(byte: u8) -> H256 {
    H256::repeat_byte(byte)
}

pub const fn start_of_epoch(epoch: Epoch) -> Slot {
    misc::compute_start_slot_at_epoch::<Minimal>(epoch)
}
