use std::collections::VecDeque;

use alloy::primitives::B256;

use crate::models::Block;

/// How a newly observed block relates to the blocks seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockClassification {
    /// Nothing recorded yet.
    First,
    /// Directly extends the recorded head.
    Next,
    /// Already recorded with the same hash.
    Duplicate,
    /// Numbers `from..=to` were skipped.
    Gap { from: u64, to: u64 },
    /// Replaces the recorded block at `number` (or the head's parent link does not hold).
    Reorg { number: u64, replaced: B256 },
    /// Older than anything still retained.
    Stale,
}

/// Bounded record of the recent chain, newest last.
#[derive(Debug)]
pub struct BlockHistory {
    blocks: VecDeque<(u64, B256, B256)>,
    capacity: usize,
}

impl BlockHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn head(&self) -> Option<u64> {
        self.blocks.back().map(|(number, _, _)| *number)
    }

    pub fn hash_at(&self, number: u64) -> Option<B256> {
        let (first, _, _) = self.blocks.front()?;
        let index = number.checked_sub(*first)? as usize;
        self.blocks.get(index).map(|(_, hash, _)| *hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn classify(&self, block: &Block) -> BlockClassification {
        let Some(&(head, head_hash, _)) = self.blocks.back() else {
            return BlockClassification::First;
        };

        if block.number == head + 1 {
            return if block.parent_hash == head_hash {
                BlockClassification::Next
            } else {
                BlockClassification::Reorg {
                    number: head,
                    replaced: head_hash,
                }
            };
        }

        if block.number > head + 1 {
            return BlockClassification::Gap {
                from: head + 1,
                to: block.number - 1,
            };
        }

        match self.hash_at(block.number) {
            Some(hash) if hash == block.hash => BlockClassification::Duplicate,
            Some(hash) => BlockClassification::Reorg {
                number: block.number,
                replaced: hash,
            },
            None => BlockClassification::Stale,
        }
    }

    /// Records `block` as the new head, dropping anything at or above its number.
    pub fn record(&mut self, block: &Block) {
        while self
            .blocks
            .back()
            .is_some_and(|(number, _, _)| *number >= block.number)
        {
            self.blocks.pop_back();
        }
        // keep the deque contiguous so that `hash_at` can index into it
        if self
            .blocks
            .back()
            .is_some_and(|(number, _, _)| *number + 1 != block.number)
        {
            self.blocks.clear();
        }
        self.blocks
            .push_back((block.number, block.hash, block.parent_hash));
        while self.blocks.len() > self.capacity {
            self.blocks.pop_front();
        }
    }
}
