use core::marker::PhantomData;
use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use helper_functions::misc;
use im::HashMap;
use log::{debug, info, warn};
use static_assertions::assert_impl_all;
use typenum::Unsigned as _;
use types::{
    config::Config as ChainConfig,
    phase0::{
        consts::INTERVALS_PER_SLOT,
        containers::Checkpoint,
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::{Mainnet, Preset},
};

use crate::{
    block_tree::BlockTree,
    error::Error,
    misc::{
        AnchorBlock, AnchorState, ApplyBlockChanges, ApplyTickChanges, BlockSummary, HeadBlock,
        HeadChange, LatestMessage, PostStateSummary, Vote,
    },
};

/// [`Store`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#store)
/// combined with the fork choice handlers that mutate it.
///
/// All mutating methods either succeed or leave the `Store` unchanged.
/// Callers that need to share a `Store` between threads should clone it. Clones are cheap.
#[derive(Clone, Debug)]
pub struct Store<P: Preset> {
    chain_config: Arc<ChainConfig>,
    time: UnixSeconds,
    genesis_time: UnixSeconds,
    justified_checkpoint: Checkpoint,
    best_justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    // `H256::zero()` if no block has been boosted in the current slot.
    proposer_boost_root: H256,
    justified_total_active_balance: Gwei,
    best_justified_total_active_balance: Gwei,
    block_tree: BlockTree,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    phantom: PhantomData<P>,
}

assert_impl_all!(Store<Mainnet>: Send, Sync);

impl<P: Preset> Store<P> {
    /// [`get_forkchoice_store`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_forkchoice_store)
    pub fn new(
        chain_config: Arc<ChainConfig>,
        anchor_block: AnchorBlock,
        anchor_state: AnchorState,
    ) -> Result<Self> {
        chain_config.validate()?;

        ensure!(
            anchor_state.latest_block_root == anchor_block.root
                && anchor_state.slot == anchor_block.slot,
            Error::AnchorMismatch {
                anchor_block,
                anchor_state,
            },
        );

        ensure!(
            misc::is_epoch_start::<P>(anchor_block.slot),
            Error::AnchorNotAtEpochStart { anchor_block },
        );

        let anchor_checkpoint = Checkpoint {
            epoch: misc::compute_epoch_at_slot::<P>(anchor_block.slot),
            root: anchor_block.root,
        };

        let Some(time) =
            misc::compute_time_at_slot(&chain_config, anchor_state.genesis_time, anchor_block.slot)
        else {
            bail!(Error::AnchorTimeOverflow {
                anchor_block,
                genesis_time: anchor_state.genesis_time,
            });
        };

        Ok(Self {
            chain_config,
            time,
            genesis_time: anchor_state.genesis_time,
            justified_checkpoint: anchor_checkpoint,
            best_justified_checkpoint: anchor_checkpoint,
            finalized_checkpoint: anchor_checkpoint,
            proposer_boost_root: H256::zero(),
            justified_total_active_balance: anchor_state.total_active_balance,
            best_justified_total_active_balance: anchor_state.total_active_balance,
            block_tree: BlockTree::new(anchor_block.root, anchor_block.slot, anchor_checkpoint),
            latest_messages: HashMap::new(),
            phantom: PhantomData,
        })
    }

    /// [`on_tick`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#on_tick)
    ///
    /// Returns `Ok(None)` if `time` is the current time.
    pub fn apply_tick(&mut self, time: UnixSeconds) -> Result<Option<ApplyTickChanges>> {
        ensure!(
            time >= self.time,
            Error::InvalidTick {
                store_time: self.time,
                tick_time: time,
            },
        );

        if time == self.time {
            return Ok(None);
        }

        let old_slot = self.current_slot();
        let old_epoch = self.current_epoch();

        self.time = time;

        if self.current_slot() == old_slot {
            return Ok(Some(ApplyTickChanges::TickUpdated));
        }

        self.proposer_boost_root = H256::zero();

        let justified_checkpoint_updated = self.current_epoch() > old_epoch
            && self.best_justified_checkpoint.epoch > self.justified_checkpoint.epoch
            && self.promote_best_justified_checkpoint();

        if justified_checkpoint_updated {
            self.update_best_descendants();
        }

        Ok(Some(ApplyTickChanges::SlotUpdated {
            justified_checkpoint_updated,
        }))
    }

    /// [`on_block`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#on_block)
    /// without the state transition.
    ///
    /// Returns `Ok(None)` if the block is already in the store.
    pub fn apply_block(
        &mut self,
        block: BlockSummary,
        post_state: PostStateSummary,
    ) -> Result<Option<ApplyBlockChanges>> {
        let BlockSummary {
            root: block_root,
            parent_root,
            slot,
        } = block;

        if self.block_tree.contains(block_root) {
            return Ok(None);
        }

        ensure!(
            self.block_tree.contains(parent_root),
            Error::UnknownParent {
                block_root,
                parent_root,
            },
        );

        let finalized_checkpoint_updated =
            post_state.finalized_checkpoint.epoch > self.finalized_checkpoint.epoch;

        // Pruning is the last step that can fail. Check it before making any modifications.
        if finalized_checkpoint_updated {
            let finalized_root = post_state.finalized_checkpoint.root;

            ensure!(
                self.block_tree.contains(finalized_root),
                Error::PruneError { finalized_root },
            );
        }

        let old_head = self.head();

        self.block_tree.insert(
            block_root,
            parent_root,
            slot,
            post_state.current_justified_checkpoint,
            post_state.finalized_checkpoint,
        )?;

        self.update_proposer_boost(block_root, slot);

        let conflicting_justified_checkpoint = self.update_checkpoints(block_root, post_state);

        if finalized_checkpoint_updated {
            self.update_finalized_checkpoint(post_state)?;
        }

        self.update_best_descendants();

        let new_head = self.head();

        let head = if new_head.root == old_head.root {
            HeadChange::AlternateChainExtended
        } else if self.block_tree.is_descendant(old_head.root, new_head.root) {
            HeadChange::CanonicalChainExtended
        } else {
            debug!("chain reorganized (old_head: {old_head:?}, new_head: {new_head:?})");
            HeadChange::Reorganized { old_head }
        };

        Ok(Some(ApplyBlockChanges {
            head,
            finalized_checkpoint_updated,
            conflicting_justified_checkpoint,
        }))
    }

    /// Applies the weight of an already validated attestation.
    ///
    /// Returns `Ok(false)` if the attested block is not in the store.
    pub fn apply_attestation(&mut self, block_root: H256, delta: i64) -> Result<bool> {
        if !self.block_tree.apply_weight_delta(block_root, delta)? {
            debug!(
                "attestation for unknown block ignored (block_root: {block_root:?}, delta: {delta})",
            );
            return Ok(false);
        }

        self.update_best_descendants();

        Ok(true)
    }

    /// Moves the balance of a validator from the block it voted for previously to the one in `vote`.
    ///
    /// Returns `Ok(false)` if the vote was ignored.
    pub fn apply_vote(&mut self, vote: Vote) -> Result<bool> {
        let Vote {
            validator_index,
            block_root,
            target_epoch,
            balance,
        } = vote;

        if !self.block_tree.contains(block_root) {
            debug!("vote for unknown block ignored: {vote:?}");
            return Ok(false);
        }

        let previous_message = self.latest_message(validator_index);

        if let Some(previous_message) = previous_message {
            if target_epoch <= previous_message.epoch {
                debug!("vote not newer than latest message ignored: {vote:?}");
                return Ok(false);
            }
        }

        // Removing the old weight and adding the new one must succeed or fail together.
        let mut block_tree = self.block_tree.clone();

        // The previously voted block may have been pruned.
        if let Some(LatestMessage { root, balance, .. }) = previous_message {
            block_tree.subtract_weight(root, balance)?;
        }

        block_tree.add_weight(block_root, balance)?;

        self.block_tree = block_tree;

        self.latest_messages.insert(
            validator_index,
            LatestMessage {
                epoch: target_epoch,
                root: block_root,
                balance,
            },
        );

        self.update_best_descendants();

        Ok(true)
    }

    /// [`get_head`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_head)
    ///
    /// Proposer boost is applied on the fly. Stored weights only reflect votes.
    #[must_use]
    pub fn head(&self) -> HeadBlock {
        let boost = (!self.proposer_boost_root.is_zero())
            .then(|| (self.proposer_boost_root, self.proposer_score()));

        let node = self.block_tree.find_head(
            self.head_search_start(),
            boost,
            self.justified_checkpoint,
            self.finalized_checkpoint,
        );

        HeadBlock {
            root: node.root,
            slot: node.slot,
        }
    }

    #[must_use]
    pub const fn chain_config(&self) -> &Arc<ChainConfig> {
        &self.chain_config
    }

    #[must_use]
    pub const fn time(&self) -> UnixSeconds {
        self.time
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    /// [`get_current_slot`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_current_slot)
    #[must_use]
    pub fn current_slot(&self) -> Slot {
        misc::compute_slot_at_time(&self.chain_config, self.genesis_time, self.time)
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.current_slot())
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub const fn best_justified_checkpoint(&self) -> Checkpoint {
        self.best_justified_checkpoint
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    /// Returns `H256::zero()` if no block has been boosted in the current slot.
    #[must_use]
    pub const fn proposer_boost_root(&self) -> H256 {
        self.proposer_boost_root
    }

    #[must_use]
    pub fn proposer_score(&self) -> Gwei {
        self.chain_config
            .proposer_score(self.justified_total_active_balance, P::SLOTS_PER_EPOCH)
    }

    #[must_use]
    pub const fn block_tree(&self) -> &BlockTree {
        &self.block_tree
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.latest_messages.get(&validator_index).copied()
    }

    fn head_search_start(&self) -> usize {
        if self.justified_checkpoint.is_zero() {
            return 0;
        }

        self.block_tree
            .index_of(self.justified_checkpoint.root)
            .unwrap_or_else(|| {
                warn!(
                    "justified block is not in the block tree; \
                     searching for head from the root of the tree \
                     (justified_checkpoint: {:?}, tree root: {:?})",
                    self.justified_checkpoint,
                    self.block_tree.root().root,
                );

                0
            })
    }

    fn update_proposer_boost(&mut self, block_root: H256, slot: Slot) {
        let attesting_interval_start =
            self.chain_config.seconds_per_slot.get() / INTERVALS_PER_SLOT.get();

        let is_before_attesting_interval =
            misc::seconds_into_slot(&self.chain_config, self.genesis_time, self.time)
                < attesting_interval_start;

        let is_timely = self.current_slot() == slot && is_before_attesting_interval;
        let is_first_block = self.proposer_boost_root.is_zero();

        if is_timely && is_first_block {
            debug!("proposer boost applied (block_root: {block_root:?}, slot: {slot})");
            self.proposer_boost_root = block_root;
        }
    }

    // Returns the justified checkpoint of the block if it conflicts with one in the store.
    fn update_checkpoints(
        &mut self,
        block_root: H256,
        post_state: PostStateSummary,
    ) -> Option<Checkpoint> {
        let PostStateSummary {
            current_justified_checkpoint: candidate,
            total_active_balance,
            ..
        } = post_state;

        // The zero checkpoint stands for the genesis block, whatever its root is.
        let conflicting_justified_checkpoint = (!candidate.is_zero()
            && (candidate.conflicts_with(self.justified_checkpoint)
                || candidate.conflicts_with(self.best_justified_checkpoint)))
        .then_some(candidate);

        if let Some(checkpoint) = conflicting_justified_checkpoint {
            warn!(
                "block justifies checkpoint that conflicts with store \
                 (block_root: {block_root:?}, checkpoint: {checkpoint:?}, \
                 justified_checkpoint: {:?}, best_justified_checkpoint: {:?})",
                self.justified_checkpoint, self.best_justified_checkpoint,
            );
        }

        if candidate.epoch > self.justified_checkpoint.epoch {
            if candidate.epoch > self.best_justified_checkpoint.epoch {
                self.best_justified_checkpoint = candidate;
                self.best_justified_total_active_balance = total_active_balance;
            }

            if self.should_update_justified_checkpoint(candidate) {
                self.set_justified_checkpoint(candidate, total_active_balance);
            }
        }

        conflicting_justified_checkpoint
    }

    /// [`should_update_justified_checkpoint`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#should_update_justified_checkpoint)
    fn should_update_justified_checkpoint(&self, new_justified_checkpoint: Checkpoint) -> bool {
        let slots_since_epoch_start = misc::slots_since_epoch_start::<P>(self.current_slot());

        if slots_since_epoch_start < P::SafeSlotsToUpdateJustified::U64 {
            return true;
        }

        let justified_slot = misc::compute_start_slot_at_epoch::<P>(self.justified_checkpoint.epoch);

        self.block_tree
            .ancestor(new_justified_checkpoint.root, justified_slot)
            == Some(self.justified_checkpoint.root)
    }

    fn update_finalized_checkpoint(&mut self, post_state: PostStateSummary) -> Result<()> {
        let PostStateSummary {
            current_justified_checkpoint,
            finalized_checkpoint,
            total_active_balance,
        } = post_state;

        let survives_pruning = |checkpoint: Checkpoint| {
            self.block_tree
                .is_descendant(finalized_checkpoint.root, checkpoint.root)
        };

        let replace_justified = current_justified_checkpoint.epoch
            > self.justified_checkpoint.epoch
            || !survives_pruning(self.justified_checkpoint);

        let replace_best_justified = !survives_pruning(self.best_justified_checkpoint);

        self.finalized_checkpoint = finalized_checkpoint;

        if replace_justified {
            self.set_justified_checkpoint(current_justified_checkpoint, total_active_balance);
        }

        if replace_best_justified
            || self.best_justified_checkpoint.epoch < self.justified_checkpoint.epoch
        {
            self.best_justified_checkpoint = self.justified_checkpoint;
            self.best_justified_total_active_balance = self.justified_total_active_balance;
        }

        let pruned = self.block_tree.prune(finalized_checkpoint.root)?;

        info!(
            "finalized checkpoint updated (finalized_checkpoint: {finalized_checkpoint:?}, \
             blocks pruned: {pruned})",
        );

        Ok(())
    }

    // Returns `true` if the best justified checkpoint was promoted.
    fn promote_best_justified_checkpoint(&mut self) -> bool {
        let finalized_slot =
            misc::compute_start_slot_at_epoch::<P>(self.finalized_checkpoint.epoch);

        let descends_from_finalized = self
            .block_tree
            .ancestor(self.best_justified_checkpoint.root, finalized_slot)
            == Some(self.finalized_checkpoint.root);

        if !descends_from_finalized {
            debug!(
                "best justified checkpoint does not descend from finalized checkpoint \
                 (best_justified_checkpoint: {:?}, finalized_checkpoint: {:?})",
                self.best_justified_checkpoint, self.finalized_checkpoint,
            );

            return false;
        }

        self.set_justified_checkpoint(
            self.best_justified_checkpoint,
            self.best_justified_total_active_balance,
        );

        true
    }

    fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint, total_active_balance: Gwei) {
        if self.justified_checkpoint != checkpoint {
            info!(
                "justified checkpoint updated (old: {:?}, new: {checkpoint:?})",
                self.justified_checkpoint,
            );
        }

        self.justified_checkpoint = checkpoint;
        self.justified_total_active_balance = total_active_balance;
    }

    fn update_best_descendants(&mut self) {
        self.block_tree
            .update_best_descendants(self.justified_checkpoint, self.finalized_checkpoint);
    }
}
