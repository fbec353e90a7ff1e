// The mutator owns the only `Store` that is ever modified. Readers go through the snapshot.
//
// Every `handle_*` method either fails without publishing anything or publishes exactly one new
// snapshot. A failed method may leave `Mutator.store` partially modified, so it is replaced with the
// last published snapshot before the error is returned.

use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use fork_choice_store::{
    ApplyBlockChanges, ApplyTickChanges, BlockSummary, HeadChange, PostStateSummary, Store, Vote,
};
use log::{debug, info, warn};
use types::{
    phase0::primitives::{UnixSeconds, H256},
    preset::Preset,
};

pub struct Mutator<P: Preset> {
    store: Arc<Store<P>>,
    store_snapshot: Arc<ArcSwap<Store<P>>>,
}

impl<P: Preset> Mutator<P> {
    pub fn new(store_snapshot: Arc<ArcSwap<Store<P>>>) -> Self {
        Self {
            store: store_snapshot.load_full(),
            store_snapshot,
        }
    }

    pub fn handle_tick(&mut self, time: UnixSeconds) -> Result<Option<ApplyTickChanges>> {
        let changes = self.mutate(|store| store.apply_tick(time))?;

        if let Some(ApplyTickChanges::SlotUpdated {
            justified_checkpoint_updated: true,
        }) = changes
        {
            info!(
                "best justified checkpoint promoted (justified_checkpoint: {})",
                self.store.justified_checkpoint(),
            );
        }

        Ok(changes)
    }

    pub fn handle_block(
        &mut self,
        block: BlockSummary,
        post_state: PostStateSummary,
    ) -> Result<Option<ApplyBlockChanges>> {
        let result = self.mutate(|store| store.apply_block(block, post_state));

        match &result {
            Ok(None) => debug!("block ignored because it is already known: {block:?}"),
            Ok(Some(changes)) => {
                if let HeadChange::Reorganized { old_head } = changes.head {
                    info!(
                        "chain reorganized (old_head: {old_head:?}, new_head: {:?})",
                        self.store.head(),
                    );
                }
            }
            Err(error) => match error.downcast_ref::<fork_choice_store::Error>() {
                Some(store_error) if store_error.is_retryable() => {
                    debug!("block delayed until parent (block: {block:?}, error: {error})");
                }
                _ => warn!("block rejected (error: {error}, block: {block:?})"),
            },
        }

        result
    }

    pub fn handle_attestation(&mut self, block_root: H256, delta: i64) -> Result<bool> {
        self.mutate(|store| store.apply_attestation(block_root, delta))
            .inspect_err(|error| {
                warn!(
                    "attestation rejected \
                     (error: {error}, block_root: {block_root:?}, delta: {delta})",
                );
            })
    }

    pub fn handle_vote(&mut self, vote: Vote) -> Result<bool> {
        self.mutate(|store| store.apply_vote(vote))
            .inspect_err(|error| warn!("vote rejected (error: {error}, vote: {vote:?})"))
    }

    fn mutate<T>(&mut self, apply: impl FnOnce(&mut Store<P>) -> Result<T>) -> Result<T> {
        match apply(self.store_mut()) {
            Ok(output) => {
                self.update_store_snapshot();
                Ok(output)
            }
            Err(error) => {
                self.store = self.store_snapshot.load_full();
                Err(error)
            }
        }
    }

    fn update_store_snapshot(&self) {
        // `ArcSwap::rcu` is not necessary here because the mutator is behind a lock.
        self.store_snapshot.store(self.owned_store());
    }

    fn store_mut(&mut self) -> &mut Store<P> {
        Arc::make_mut(&mut self.store)
    }

    fn owned_store(&self) -> Arc<Store<P>> {
        Arc::clone(&self.store)
    }
}
