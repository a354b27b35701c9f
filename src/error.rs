use thiserror::Error;

/// Failures of the attack itself. Any of these aborts recovery of the block
/// (or ciphertext) it was raised for.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttackError {
    #[error("ciphertext is empty")]
    EmptyCiphertext,
    #[error("ciphertext length {len} is not a multiple of the block size {block_size}")]
    InvalidCiphertextLength { len: usize, block_size: usize },
    #[error("no candidate byte gave valid padding at position {position} of block {block}")]
    CandidateNotFound { block: usize, position: usize },
    #[error(
        "could not confirm a padding length of 1 for block {block}: \
        candidates {candidates:02x?} all failed the decoy query"
    )]
    AmbiguityUnresolved { block: usize, candidates: Vec<u8> },
    #[error("recovered plaintext has invalid padding (last byte {last_byte:#04x})")]
    PaddingIntegrity { last_byte: u8 },
    #[error("oracle query failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Failures reaching the oracle. These are never answers about padding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed oracle request: {0}")]
    Malformed(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Transport(_) | OracleError::Timeout)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key length {0}: expected 16, 24 or 32 bytes")]
    InvalidKeyLength(usize),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidLength(usize),
    #[error("invalid pkcs7 padding")]
    InvalidPadding,
}
