// Padding oracles: the only view the attack has of the victim.
use crate::{AesCbc, Block, CipherError, OracleError, AES_BLOCK_SIZE};

use tracing::warn;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers whether `target`, CBC-decrypted with `previous` as its chaining
/// block, ends in valid padding.
///
/// `Ok(false)` means the padding is invalid. An `Err` means the question went
/// unanswered and must not be taken as invalid padding.
pub trait PaddingOracle<const N: usize>: Sync {
    fn check(&self, previous: &Block<N>, target: &Block<N>) -> Result<bool, OracleError>;
}

impl<const N: usize, O: PaddingOracle<N> + ?Sized> PaddingOracle<N> for &O {
    fn check(&self, previous: &Block<N>, target: &Block<N>) -> Result<bool, OracleError> {
        (**self).check(previous, target)
    }
}

/// An in-process oracle holding the key. The key stays private; the only
/// thing it gives out is the padding verdict.
#[derive(Debug, Clone)]
pub struct LocalOracle {
    cipher: AesCbc,
    delay: Option<Duration>,
}

impl LocalOracle {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        Ok(Self {
            cipher: AesCbc::new(key)?,
            delay: None,
        })
    }

    /// Sleep for `delay` on every query, like a slow remote service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ciphertext_padding_valid(&self, iv: &Block<AES_BLOCK_SIZE>, ciphertext: &[u8]) -> bool {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.cipher.decrypt(iv, ciphertext).is_ok()
    }
}

impl PaddingOracle<AES_BLOCK_SIZE> for LocalOracle {
    fn check(
        &self,
        previous: &Block<AES_BLOCK_SIZE>,
        target: &Block<AES_BLOCK_SIZE>,
    ) -> Result<bool, OracleError> {
        Ok(self.ciphertext_padding_valid(previous, target))
    }
}

/// Wraps a closure as an oracle.
pub struct FnOracle<F>(F);

impl<F> FnOracle<F> {
    pub fn new<const N: usize>(f: F) -> Self
    where
        F: Fn(&Block<N>, &Block<N>) -> Result<bool, OracleError> + Sync,
    {
        Self(f)
    }
}

impl<const N: usize, F> PaddingOracle<N> for FnOracle<F>
where
    F: Fn(&Block<N>, &Block<N>) -> Result<bool, OracleError> + Sync,
{
    fn check(&self, previous: &Block<N>, target: &Block<N>) -> Result<bool, OracleError> {
        (self.0)(previous, target)
    }
}

/// Counts the queries passed through to the inner oracle.
pub struct CountingOracle<O> {
    inner: O,
    queries: AtomicUsize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::Relaxed);
    }
}

impl<const N: usize, O: PaddingOracle<N>> PaddingOracle<N> for CountingOracle<O> {
    fn check(&self, previous: &Block<N>, target: &Block<N>) -> Result<bool, OracleError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.inner.check(previous, target)
    }
}

/// Retries transport failures of the inner oracle. Retries wait
/// `backoff * attempt` before going again.
pub struct RetryingOracle<O> {
    inner: O,
    retries: u32,
    backoff: Duration,
}

impl<O> RetryingOracle<O> {
    pub fn new(inner: O, retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            retries,
            backoff,
        }
    }
}

impl<const N: usize, O: PaddingOracle<N>> PaddingOracle<N> for RetryingOracle<O> {
    fn check(&self, previous: &Block<N>, target: &Block<N>) -> Result<bool, OracleError> {
        let mut attempt = 0;
        loop {
            match self.inner.check(previous, target) {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, retries = self.retries, error = %e, "retrying oracle query");
                    std::thread::sleep(self.backoff * attempt);
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fixtures;

    use rstest::rstest;

    fn split_last_two(ciphertext: &[u8]) -> ([u8; 16], [u8; 16]) {
        let n = ciphertext.len();
        (
            ciphertext[n - 32..n - 16].try_into().unwrap(),
            ciphertext[n - 16..].try_into().unwrap(),
        )
    }

    #[test]
    fn local_oracle_accepts_genuine_final_block() {
        let oracle = LocalOracle::new(&fixtures::key()).unwrap();
        let (previous, target) = split_last_two(&fixtures::ciphertext_v1());

        assert_eq!(oracle.check(&previous, &target), Ok(true));
    }

    #[test]
    fn local_oracle_rejects_tampered_final_block() {
        let oracle = LocalOracle::new(&fixtures::key()).unwrap();
        let (mut previous, target) = split_last_two(&fixtures::ciphertext_v1());
        // The final plaintext byte is 0x07; flipping it to 0x00 breaks padding.
        previous[15] ^= 0x07;

        assert_eq!(oracle.check(&previous, &target), Ok(false));
    }

    #[test]
    fn local_oracle_treats_malformed_ciphertext_as_invalid() {
        let oracle = LocalOracle::new(&fixtures::key()).unwrap();

        assert!(!oracle.ciphertext_padding_valid(&fixtures::iv(), &[1, 2, 3]));
        assert!(!oracle.ciphertext_padding_valid(&fixtures::iv(), &[]));
    }

    #[test]
    fn counting_oracle_counts_every_query() {
        let oracle = CountingOracle::new(FnOracle::new(|_: &[u8; 4], _: &[u8; 4]| Ok(false)));

        for _ in 0..5 {
            oracle.check(&[0; 4], &[0; 4]).unwrap();
        }

        assert_eq!(oracle.queries(), 5);
        oracle.reset();
        assert_eq!(oracle.queries(), 0);
    }

    #[rstest]
    #[case(0, Ok(true))]
    #[case(2, Ok(true))]
    #[case(3, Err(OracleError::Timeout))]
    fn retrying_oracle_retries_timeouts(
        #[case] failures: usize,
        #[case] expected: Result<bool, OracleError>,
    ) {
        let answer = CountingOracle::new(FnOracle::new(|_: &[u8; 4], _: &[u8; 4]| Ok(true)));
        let calls = AtomicUsize::new(0);
        let oracle = RetryingOracle::new(
            FnOracle::new(|previous: &[u8; 4], target: &[u8; 4]| {
                if calls.fetch_add(1, Ordering::Relaxed) < failures {
                    Err(OracleError::Timeout)
                } else {
                    answer.check(previous, target)
                }
            }),
            2,
            Duration::from_millis(1),
        );

        assert_eq!(oracle.check(&[0; 4], &[0; 4]), expected);
        assert_eq!(calls.load(Ordering::Relaxed), failures.min(2) + 1);
    }

    #[test]
    fn retrying_oracle_does_not_retry_unexpected_status() {
        let calls = AtomicUsize::new(0);
        let oracle = RetryingOracle::new(
            FnOracle::new(|_: &[u8; 4], _: &[u8; 4]| {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(OracleError::UnexpectedStatus(500))
            }),
            5,
            Duration::from_millis(1),
        );

        assert_eq!(
            oracle.check(&[0; 4], &[0; 4]),
            Err(OracleError::UnexpectedStatus(500))
        );
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
