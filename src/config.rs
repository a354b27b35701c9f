use std::time::Duration;

/// How the 256 candidates for one byte position are put to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    /// One query at a time, stopping at the first confirmed candidate.
    #[default]
    Sequential,
    /// All candidates at once on the rayon pool. Confirmation waits until
    /// every query for the position has come back.
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackConfig {
    pub parallel_blocks: bool,
    pub scan: ScanStrategy,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            parallel_blocks: true,
            scan: ScanStrategy::Sequential,
            retries: 3,
            retry_backoff: Duration::from_millis(50),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl AttackConfig {
    pub fn with_parallel_blocks(mut self, parallel_blocks: bool) -> Self {
        self.parallel_blocks = parallel_blocks;
        self
    }

    pub fn with_scan(mut self, scan: ScanStrategy) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
