// Client side of the HTTP oracle served by `server`.
use crate::{AttackConfig, Block, OracleError, PaddingOracle, AES_BLOCK_SIZE};

use reqwest::{blocking::Client, StatusCode};
use tracing::trace;

use std::time::Duration;

/// Queries a padding oracle over HTTP. Anything that is not a clear
/// valid/invalid answer comes back as an `OracleError`.
#[derive(Debug, Clone)]
pub struct RemoteOracle {
    client: Client,
    url: String,
}

impl RemoteOracle {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/check", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(base_url: &str, config: &AttackConfig) -> Result<Self, OracleError> {
        Self::new(base_url, config.request_timeout)
    }
}

impl PaddingOracle<AES_BLOCK_SIZE> for RemoteOracle {
    fn check(
        &self,
        previous: &Block<AES_BLOCK_SIZE>,
        target: &Block<AES_BLOCK_SIZE>,
    ) -> Result<bool, OracleError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("iv", hex::encode(previous)), ("ciphertext", hex::encode(target))])
            .send()
            .map_err(transport_error)?;
        trace!(status = %response.status(), "oracle responded");
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::FORBIDDEN => Ok(false),
            status => Err(OracleError::UnexpectedStatus(status.as_u16())),
        }
    }
}

fn transport_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Transport(e.to_string())
    }
}
