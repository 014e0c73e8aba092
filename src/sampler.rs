// src/sampler.rs

//! Random partitioning of the samples into blocks, one permutation per epoch.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// The blocks of one epoch: a sample ordering cut into contiguous chunks.
///
/// The last chunk is shorter when the block size does not divide the
/// ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochBlocks {
    order: Vec<usize>,
    block: usize,
}

impl EpochBlocks {
    /// Build from an explicit ordering of sample indices.
    ///
    /// # Panics
    /// If `block` is zero.
    pub fn new(order: Vec<usize>, block: usize) -> Self {
        assert!(block > 0, "block size must be positive");
        Self { order, block }
    }

    /// Iterate over the index blocks.
    pub fn iter(&self) -> std::slice::Chunks<'_, usize> {
        self.order.chunks(self.block)
    }

    /// Number of blocks, counting a trailing partial block.
    pub fn len(&self) -> usize {
        self.order.len().div_ceil(self.block)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The full sample ordering of this epoch.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn block_size(&self) -> usize {
        self.block
    }

    pub fn into_order(self) -> Vec<usize> {
        self.order
    }
}

impl<'a> IntoIterator for &'a EpochBlocks {
    type Item = &'a [usize];
    type IntoIter = std::slice::Chunks<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Supplies the block ordering for each epoch.
pub trait BlockOrder {
    /// Produce the blocks for the next epoch.
    fn next_epoch(&mut self) -> EpochBlocks;
}

/// Draws a fresh uniform permutation of `0..n_samples` for every epoch.
#[derive(Debug, Clone)]
pub struct BlockSampler {
    n_samples: usize,
    block: usize,
    seed: u64,
    rng: StdRng,
}

impl BlockSampler {
    /// # Panics
    /// If `block` is zero.
    pub fn new(n_samples: usize, block: usize, seed: u64) -> Self {
        assert!(block > 0, "block size must be positive");
        Self {
            n_samples,
            block,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed the permutations were drawn from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn block_size(&self) -> usize {
        self.block
    }
}

impl BlockOrder for BlockSampler {
    fn next_epoch(&mut self) -> EpochBlocks {
        let mut order: Vec<usize> = (0..self.n_samples).collect();
        order.shuffle(&mut self.rng);
        EpochBlocks::new(order, self.block)
    }
}
