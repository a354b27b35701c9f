use crate::AttackError;

/// One cipher block. The block size is carried in the type.
pub type Block<const N: usize> = [u8; N];

pub fn xor_blocks<const N: usize>(a: &Block<N>, b: &Block<N>) -> Block<N> {
    let mut out = [0u8; N];
    out.iter_mut()
        .zip(a.iter().zip(b.iter()))
        .for_each(|(o, (x, y))| *o = x ^ y);
    out
}

/// Turn a recovered intermediate state into plaintext using the real
/// previous ciphertext block (or the IV for the first block).
pub fn assemble_plaintext<const N: usize>(
    intermediate: &Block<N>,
    true_previous: &Block<N>,
) -> Block<N> {
    xor_blocks(intermediate, true_previous)
}

pub fn split_blocks<const N: usize>(bytes: &[u8]) -> Result<Vec<Block<N>>, AttackError> {
    if bytes.is_empty() {
        return Err(AttackError::EmptyCiphertext);
    }
    if bytes.len() % N != 0 {
        return Err(AttackError::InvalidCiphertextLength {
            len: bytes.len(),
            block_size: N,
        });
    }
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut block = [0u8; N];
            block.copy_from_slice(chunk);
            block
        })
        .collect())
}
