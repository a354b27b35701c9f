mod attack;
mod block;
mod cipher;
mod config;
mod error;
pub mod fixtures;
mod oracle;
mod pkcs7;
mod recover;
mod remote;
mod server;

pub use attack::{Attack, BlockOutcome};
pub use block::{assemble_plaintext, split_blocks, xor_blocks, Block};
pub use cipher::{AesCbc, AES_BLOCK_SIZE};
pub use config::{AttackConfig, ScanStrategy};
pub use error::{AttackError, CipherError, OracleError};
pub use oracle::{CountingOracle, FnOracle, LocalOracle, PaddingOracle, RetryingOracle};
pub use pkcs7::{pkcs7_pad, pkcs7_padding_len, pkcs7_unpad};
pub use recover::{recover_intermediate, IntermediateState};
pub use remote::RemoteOracle;
pub use server::{router, serve, spawn_oracle_server};
