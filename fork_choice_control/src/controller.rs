// All mutations go through a single `Mutator` guarded by a lock. Query methods operate on the latest
// published snapshot of `Store` and never wait for the lock.
// This serves to accomplish 2 things:
// - Query methods do not block while a block is being processed.
// - Readers never observe a partially applied mutation, including a partially completed prune.
//
// The downside is that each successful mutation allocates a new `Store` if a reader is holding on to
// the previous snapshot. `Store` uses persistent collections, so the allocation is shallow.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use arc_swap::{ArcSwap, Guard};
use fork_choice_store::{
    AnchorBlock, AnchorState, ApplyBlockChanges, ApplyTickChanges, BlockSummary,
    PostStateSummary, Store, Vote,
};
use log::info;
use parking_lot::Mutex;
use thiserror::Error;
use types::{
    config::Config as ChainConfig,
    phase0::primitives::{UnixSeconds, H256},
    preset::Preset,
};

use crate::mutator::Mutator;

pub struct Controller<P: Preset> {
    // The latest consistent snapshot of the store.
    store_snapshot: Arc<ArcSwap<Store<P>>>,
    mutator: Mutex<Mutator<P>>,
}

impl<P: Preset> Controller<P> {
    pub fn new(
        chain_config: Arc<ChainConfig>,
        anchor_block: AnchorBlock,
        anchor_state: AnchorState,
    ) -> Result<Self> {
        let store = Store::new(chain_config, anchor_block, anchor_state)
            .context(Error::InitializationFailed)?;

        info!(
            "fork choice store initialized (anchor_block: {anchor_block:?}, preset: {})",
            P::NAME,
        );

        let store_snapshot = Arc::new(ArcSwap::from_pointee(store));
        let mutator = Mutex::new(Mutator::new(Arc::clone(&store_snapshot)));

        Ok(Self {
            store_snapshot,
            mutator,
        })
    }

    // This should be called at least once per slot.
    // More frequent calls only affect whether blocks are considered timely for proposer boost.
    pub fn on_tick(&self, time: UnixSeconds) -> Result<Option<ApplyTickChanges>> {
        self.mutator
            .lock()
            .handle_tick(time)
            .context(Error::TickRejected { time })
    }

    pub fn on_block(
        &self,
        block: BlockSummary,
        post_state: PostStateSummary,
    ) -> Result<Option<ApplyBlockChanges>> {
        self.mutator
            .lock()
            .handle_block(block, post_state)
            .context(Error::BlockRejected { block })
    }

    pub fn on_attestation(&self, block_root: H256, delta: i64) -> Result<bool> {
        self.mutator
            .lock()
            .handle_attestation(block_root, delta)
            .context(Error::AttestationRejected { block_root, delta })
    }

    pub fn on_vote(&self, vote: Vote) -> Result<bool> {
        self.mutator
            .lock()
            .handle_vote(vote)
            .context(Error::VoteRejected { vote })
    }

    pub(crate) fn store_snapshot(&self) -> Guard<Arc<Store<P>>> {
        self.store_snapshot.load()
    }

    pub(crate) fn owned_store_snapshot(&self) -> Arc<Store<P>> {
        self.store_snapshot.load_full()
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("failed to initialize fork choice store")]
    InitializationFailed,
    #[error("tick rejected (time: {time})")]
    TickRejected { time: UnixSeconds },
    #[error("block rejected (block: {block:?})")]
    BlockRejected { block: BlockSummary },
    #[error("attestation rejected (block_root: {block_root:?}, delta: {delta})")]
    AttestationRejected { block_root: H256, delta: i64 },
    #[error("vote rejected (vote: {vote:?})")]
    VoteRejected { vote: Vote },
}
