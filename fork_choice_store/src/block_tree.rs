//! Arena of unfinalized blocks with cached best descendants.
//!
//! Nodes are stored in insertion order. A parent is always inserted before its children, so every
//! node has a larger index than its parent. Walking the arena backwards therefore visits children
//! before parents, which is all [`BlockTree::update_best_descendants`] needs.
//!
//! The layout follows [`proto_array`], minus the incremental score bookkeeping.
//! Best children are recomputed from scratch after every change.
//!
//! [`proto_array`]: https://github.com/protolambda/lmd-ghost/tree/242f0dced3b34feed0d4e9d2fd0e5e66e448c359#array-based-stateful-dag-proto_array

use core::iter;

use anyhow::{bail, ensure, Result};
use im::{HashMap, Vector};
use types::phase0::{
    consts::GENESIS_EPOCH,
    containers::Checkpoint,
    primitives::{Gwei, Slot, H256},
};

use crate::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockNode {
    pub root: H256,
    pub parent: Option<usize>,
    pub slot: Slot,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    /// Sum of the weight of votes for this block and all of its descendants.
    pub weight: Gwei,
    pub best_child: Option<usize>,
    /// `None` if the node is the head of its own subtree.
    pub best_descendant: Option<usize>,
}

impl BlockNode {
    // [`filter_block_tree`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#filter_block_tree)
    fn is_viable(
        &self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> bool {
        let correct_justified = justified_checkpoint.epoch == GENESIS_EPOCH
            || self.justified_checkpoint == justified_checkpoint;

        let correct_finalized = finalized_checkpoint.epoch == GENESIS_EPOCH
            || self.finalized_checkpoint == finalized_checkpoint;

        correct_justified && correct_finalized
    }

    fn leads_to_viable_head(
        &self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> bool {
        // `best_descendant` is only set if some child leads to a viable head.
        self.best_descendant.is_some()
            || self.is_viable(justified_checkpoint, finalized_checkpoint)
    }

    // Ties are broken in favor of the block with the higher root.
    // `H256` compares bytes lexicographically, which is the same as comparing big-endian integers.
    const fn sort_key(&self, extra_weight: Gwei) -> (Gwei, H256) {
        (self.weight.saturating_add(extra_weight), self.root)
    }
}

#[derive(Clone, Debug)]
pub struct BlockTree {
    nodes: Vector<BlockNode>,
    indices: HashMap<H256, usize>,
}

impl BlockTree {
    #[must_use]
    pub fn new(root: H256, slot: Slot, checkpoint: Checkpoint) -> Self {
        let anchor = BlockNode {
            root,
            parent: None,
            slot,
            justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            weight: 0,
            best_child: None,
            best_descendant: None,
        };

        Self {
            nodes: im::vector![anchor],
            indices: im::hashmap! { root => 0 },
        }
    }

    /// Returns `Ok(false)` if the block is already in the tree.
    pub fn insert(
        &mut self,
        root: H256,
        parent_root: H256,
        slot: Slot,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> Result<bool> {
        if self.contains(root) {
            return Ok(false);
        }

        let Some(parent_index) = self.index_of(parent_root) else {
            bail!(Error::UnknownParent {
                block_root: root,
                parent_root,
            });
        };

        let parent_slot = self.nodes[parent_index].slot;

        ensure!(
            slot >= parent_slot,
            Error::BlockSlotBeforeParent {
                block_root: root,
                slot,
                parent_slot,
            },
        );

        let index = self.nodes.len();

        self.nodes.push_back(BlockNode {
            root,
            parent: Some(parent_index),
            slot,
            justified_checkpoint,
            finalized_checkpoint,
            weight: 0,
            best_child: None,
            best_descendant: None,
        });

        self.indices.insert(root, index);

        Ok(true)
    }

    /// Adds `delta` to the weight of the block and all of its ancestors.
    ///
    /// Returns `Ok(false)` if the block is not in the tree.
    /// Weights are left untouched if any of them would go out of range.
    pub fn apply_weight_delta(&mut self, root: H256, delta: i64) -> Result<bool> {
        if delta < 0 {
            self.subtract_weight(root, delta.unsigned_abs())
        } else {
            self.add_weight(root, delta.unsigned_abs())
        }
    }

    pub fn add_weight(&mut self, root: H256, amount: Gwei) -> Result<bool> {
        self.update_weights(root, |node| {
            node.weight.checked_add(amount).ok_or(Error::WeightOverflow {
                block_root: node.root,
                weight: node.weight,
                amount,
            })
        })
    }

    pub fn subtract_weight(&mut self, root: H256, amount: Gwei) -> Result<bool> {
        self.update_weights(root, |node| {
            node.weight.checked_sub(amount).ok_or(Error::WeightUnderflow {
                block_root: node.root,
                weight: node.weight,
                amount,
            })
        })
    }

    fn update_weights(
        &mut self,
        root: H256,
        new_weight: impl Fn(&BlockNode) -> Result<Gwei, Error>,
    ) -> Result<bool> {
        let Some(index) = self.index_of(root) else {
            return Ok(false);
        };

        // Compute all new weights before writing any of them.
        let new_weights = self
            .ancestor_indices(index)
            .map(|index| -> Result<_> { Ok((index, new_weight(&self.nodes[index])?)) })
            .collect::<Result<Vec<_>>>()?;

        for (index, weight) in new_weights {
            self.nodes[index].weight = weight;
        }

        Ok(true)
    }

    /// Recomputes `best_child` and `best_descendant` of every node.
    pub fn update_best_descendants(
        &mut self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) {
        for node in self.nodes.iter_mut() {
            node.best_child = None;
            node.best_descendant = None;
        }

        for child_index in (0..self.nodes.len()).rev() {
            let child = self.nodes[child_index];

            let Some(parent_index) = child.parent else {
                continue;
            };

            if !child.leads_to_viable_head(justified_checkpoint, finalized_checkpoint) {
                continue;
            }

            let parent = &self.nodes[parent_index];

            let child_is_better = match parent.best_child {
                Some(best_child_index) => {
                    child.sort_key(0) > self.nodes[best_child_index].sort_key(0)
                }
                None => true,
            };

            if child_is_better {
                let parent = &mut self.nodes[parent_index];
                parent.best_child = Some(child_index);
                parent.best_descendant = Some(child.best_descendant.unwrap_or(child_index));
            }
        }
    }

    /// Finds the head of the subtree rooted at `start_index`.
    ///
    /// If `boost` is present, `proposer_score` is added to the weight of the boosted block and all
    /// of its ancestors for the duration of the search. The boosted block must be a descendant of
    /// the start block for the boost to have any effect.
    #[must_use]
    pub fn find_head(
        &self,
        start_index: usize,
        boost: Option<(H256, Gwei)>,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> &BlockNode {
        let boosted_path = boost
            .and_then(|(root, proposer_score)| {
                let path = self.path_from(start_index, self.index_of(root)?)?;
                Some((path, proposer_score))
            })
            .filter(|(path, _)| !path.is_empty());

        let Some((path, proposer_score)) = boosted_path else {
            return self.best_descendant_or_self(start_index);
        };

        let mut current_index = start_index;

        // `path` contains the blocks after the start block up to and including the boosted one.
        for path_child_index in path {
            let current = &self.nodes[current_index];
            let path_child = &self.nodes[path_child_index];

            if current.best_child == Some(path_child_index) {
                current_index = path_child_index;
                continue;
            }

            if !path_child.leads_to_viable_head(justified_checkpoint, finalized_checkpoint) {
                return self.best_descendant_or_self(current_index);
            }

            let path_child_wins = match current.best_child {
                Some(best_child_index) => {
                    path_child.sort_key(proposer_score) > self.nodes[best_child_index].sort_key(0)
                }
                None => true,
            };

            if !path_child_wins {
                return self.best_descendant_or_self(current_index);
            }

            current_index = path_child_index;
        }

        self.best_descendant_or_self(current_index)
    }

    /// Removes all blocks that are not `finalized_root` or its descendants.
    ///
    /// The finalized block becomes the root of the tree.
    /// Returns the number of blocks removed.
    pub fn prune(&mut self, finalized_root: H256) -> Result<usize> {
        let Some(finalized_index) = self.index_of(finalized_root) else {
            bail!(Error::PruneError { finalized_root });
        };

        if finalized_index == 0 {
            return Ok(0);
        }

        let mut new_indices = vec![None; self.nodes.len()];
        let mut nodes = Vector::new();

        // Blocks before the finalized one cannot be its descendants.
        for (old_index, node) in self.nodes.iter().enumerate().skip(finalized_index) {
            let parent = if old_index == finalized_index {
                None
            } else {
                match node.parent.and_then(|parent_index| new_indices[parent_index]) {
                    Some(parent_index) => Some(parent_index),
                    None => continue,
                }
            };

            new_indices[old_index] = Some(nodes.len());
            nodes.push_back(BlockNode { parent, ..*node });
        }

        // Best children of retained blocks are retained too.
        for node in nodes.iter_mut() {
            node.best_child = node.best_child.and_then(|index| new_indices[index]);
            node.best_descendant = node.best_descendant.and_then(|index| new_indices[index]);
        }

        let removed = self.nodes.len() - nodes.len();

        self.indices = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.root, index))
            .collect();

        self.nodes = nodes;

        Ok(removed)
    }

    #[must_use]
    pub fn contains(&self, root: H256) -> bool {
        self.indices.contains_key(&root)
    }

    #[must_use]
    pub fn index_of(&self, root: H256) -> Option<usize> {
        self.indices.get(&root).copied()
    }

    #[must_use]
    pub fn node(&self, root: H256) -> Option<&BlockNode> {
        self.index_of(root).map(|index| &self.nodes[index])
    }

    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<&BlockNode> {
        self.nodes.get(index)
    }

    /// The oldest block in the tree. This is the anchor or the latest finalized block.
    #[must_use]
    pub fn root(&self) -> &BlockNode {
        // The tree is never empty. Pruning always retains the finalized block.
        &self.nodes[0]
    }

    /// [`get_ancestor`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_ancestor)
    ///
    /// Returns `None` if the block is unknown or the ancestor has been pruned.
    #[must_use]
    pub fn ancestor(&self, root: H256, slot: Slot) -> Option<H256> {
        let index = self.index_of(root)?;

        self.ancestor_indices(index)
            .map(|index| &self.nodes[index])
            .find(|node| node.slot <= slot)
            .map(|node| node.root)
    }

    /// Returns `true` if `descendant_root` is `ancestor_root` or one of its descendants.
    #[must_use]
    pub fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool {
        let (Some(ancestor_index), Some(descendant_index)) =
            (self.index_of(ancestor_root), self.index_of(descendant_root))
        else {
            return false;
        };

        self.path_from(ancestor_index, descendant_index).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockNode> {
        self.nodes.iter()
    }

    fn best_descendant_or_self(&self, index: usize) -> &BlockNode {
        let node = &self.nodes[index];
        node.best_descendant.map_or(node, |index| &self.nodes[index])
    }

    // Yields `index` followed by the indices of all of its ancestors.
    fn ancestor_indices(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        iter::successors(Some(index), |index| self.nodes[*index].parent)
    }

    // Indices of blocks on the path from `ancestor_index` (exclusive) to `descendant_index`
    // (inclusive) or `None` if `descendant_index` does not descend from `ancestor_index`.
    fn path_from(&self, ancestor_index: usize, descendant_index: usize) -> Option<Vec<usize>> {
        let mut path = self
            .ancestor_indices(descendant_index)
            .take_while(|index| *index >= ancestor_index)
            .collect::<Vec<_>>();

        if path.pop() != Some(ancestor_index) {
            return None;
        }

        path.reverse();

        Some(path)
    }
}
