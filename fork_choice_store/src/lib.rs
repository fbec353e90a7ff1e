//! Implementation of [Beacon Chain Fork Choice].
//!
//! Blocks are kept in a [`BlockTree`], an arena in which every block has a larger index than its
//! parent. Each node caches its best child and best descendant. The cache is recomputed in a single
//! backwards pass over the arena after every change that can affect it (new blocks, new votes,
//! a different justified or finalized checkpoint). Finding the head is then a single lookup.
//!
//! Proposer boost is not stored in the weights. [`Store::head`] adds it to the path leading to the
//! boosted block while searching, so the stored weights always equal the sum of applied votes.
//!
//! Blocks are expected to have gone through the state transition before being passed to
//! [`Store::apply_block`]. Only the checkpoints and balance from the resulting state are needed.
//! Similarly, attestations and votes are expected to be validated by the caller.
//!
//! Blocks that do not descend from the finalized block are removed as soon as the finalized
//! checkpoint is updated. Attestations and votes referring to removed blocks are ignored.
//!
//! This implementation makes use of persistent data structures, but they are not required for the
//! algorithm to work. They're only used to make snapshots cheap.
//!
//! Python `assert`s are represented by statements that return [`Err`].
//!
//! [Beacon Chain Fork Choice]: https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md

pub use crate::{
    block_tree::{BlockNode, BlockTree},
    error::Error,
    misc::{
        AnchorBlock, AnchorState, ApplyBlockChanges, ApplyTickChanges, BlockSummary, HeadBlock,
        HeadChange, LatestMessage, PostStateSummary, Vote,
    },
    store::Store,
};

mod block_tree;
mod error;
mod misc;
mod store;
