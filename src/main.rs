use padding_oracle::{
    fixtures, serve, Attack, AttackConfig, Block, LocalOracle, PaddingOracle, RemoteOracle,
    RetryingOracle, ScanStrategy, AES_BLOCK_SIZE,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::{path::PathBuf, time::Duration};

/// Recover CBC plaintext through a padding oracle.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG wins if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decrypt a ciphertext through a remote or local oracle.
    Attack(AttackArgs),
    /// Serve a padding oracle over HTTP.
    Serve {
        /// AES key as hex (16, 24 or 32 bytes).
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "127.0.0.1:9000")]
        addr: String,
        /// Delay added to every oracle query, in milliseconds.
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Attack one of the built-in ciphertexts with an in-process oracle.
    Demo {
        #[arg(long, value_enum, default_value_t = DemoCiphertext::V2)]
        which: DemoCiphertext,
        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args, Debug)]
struct AttackArgs {
    /// IV as hex.
    #[arg(long)]
    iv: String,
    /// Ciphertext as hex.
    #[arg(long, conflicts_with = "ciphertext_file", required_unless_present = "ciphertext_file")]
    ciphertext: Option<String>,
    /// File holding the raw ciphertext bytes.
    #[arg(long)]
    ciphertext_file: Option<PathBuf>,
    /// Base URL of an HTTP padding oracle, e.g. http://127.0.0.1:9000.
    #[arg(long, conflicts_with = "key", required_unless_present = "key")]
    oracle_url: Option<String>,
    /// AES key as hex, to build an in-process oracle instead.
    #[arg(long)]
    key: Option<String>,
    /// Report every block's outcome instead of stopping at the first failure.
    #[arg(long)]
    keep_going: bool,
    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Args, Debug)]
struct Tuning {
    /// Attack blocks one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,
    /// Send all 256 guesses for a byte at once.
    #[arg(long)]
    parallel_scan: bool,
    /// Retries for an oracle query that failed in transport.
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Oracle request timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

impl Tuning {
    fn config(&self) -> AttackConfig {
        let scan = if self.parallel_scan {
            ScanStrategy::Parallel
        } else {
            ScanStrategy::Sequential
        };
        AttackConfig::default()
            .with_parallel_blocks(!self.sequential)
            .with_scan(scan)
            .with_retries(self.retries)
            .with_request_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DemoCiphertext {
    V1,
    V2,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Attack(args) => run_attack(args),
        Command::Serve {
            key,
            addr,
            delay_ms,
        } => run_server(&key, &addr, delay_ms),
        Command::Demo { which, tuning } => run_demo(which, &tuning),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_attack(args: AttackArgs) -> Result<()> {
    let iv = parse_iv(&args.iv)?;
    let ciphertext = match (&args.ciphertext, &args.ciphertext_file) {
        (Some(hex_str), _) => hex::decode(hex_str.trim()).context("ciphertext is not valid hex")?,
        (None, Some(path)) => std::fs::read(path)
            .with_context(|| format!("could not read ciphertext from {}", path.display()))?,
        (None, None) => bail!("one of --ciphertext or --ciphertext-file is required"),
    };
    let config = args.tuning.config();

    match (&args.oracle_url, &args.key) {
        (Some(url), _) => {
            let remote = RemoteOracle::from_config(url, &config)?;
            let oracle = RetryingOracle::new(remote, config.retries, config.retry_backoff);
            run_with_oracle(&oracle, config, &iv, &ciphertext, args.keep_going)
        }
        (None, Some(key)) => {
            let oracle = local_oracle(key, 0)?;
            run_with_oracle(&oracle, config, &iv, &ciphertext, args.keep_going)
        }
        (None, None) => bail!("one of --oracle-url or --key is required"),
    }
}

fn run_with_oracle<O: PaddingOracle<AES_BLOCK_SIZE>>(
    oracle: &O,
    config: AttackConfig,
    iv: &Block<AES_BLOCK_SIZE>,
    ciphertext: &[u8],
    keep_going: bool,
) -> Result<()> {
    let attack = Attack::with_config(oracle, config);
    if !keep_going {
        let plaintext = attack.decrypt(iv, ciphertext)?;
        print_plaintext(&plaintext);
        return Ok(());
    }

    let outcomes = attack.recover_blocks(iv, ciphertext)?;
    let mut failures = 0;
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(block) => println!(
                "block {index}: {} {:?}",
                hex::encode(block),
                String::from_utf8_lossy(block)
            ),
            Err(e) => {
                failures += 1;
                println!("block {index}: failed: {e}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} blocks could not be recovered", outcomes.len());
    }
    Ok(())
}

fn run_server(key: &str, addr: &str, delay_ms: u64) -> Result<()> {
    let oracle = local_oracle(key, delay_ms)?;
    let runtime = tokio::runtime::Runtime::new().context("could not start tokio runtime")?;
    runtime
        .block_on(serve(addr, oracle))
        .with_context(|| format!("padding oracle server on {addr} failed"))
}

fn run_demo(which: DemoCiphertext, tuning: &Tuning) -> Result<()> {
    let ciphertext = match which {
        DemoCiphertext::V1 => fixtures::ciphertext_v1(),
        DemoCiphertext::V2 => fixtures::ciphertext_v2(),
    };
    let oracle = LocalOracle::new(&fixtures::key())?;
    info!(?which, bytes = ciphertext.len(), "running demo attack");

    let plaintext = Attack::with_config(&oracle, tuning.config())
        .decrypt(&fixtures::iv(), &ciphertext)?;
    print_plaintext(&plaintext);
    Ok(())
}

fn local_oracle(key_hex: &str, delay_ms: u64) -> Result<LocalOracle> {
    let key = hex::decode(key_hex.trim()).context("key is not valid hex")?;
    let oracle = LocalOracle::new(&key)?;
    Ok(match delay_ms {
        0 => oracle,
        ms => oracle.with_delay(Duration::from_millis(ms)),
    })
}

fn parse_iv(iv_hex: &str) -> Result<Block<AES_BLOCK_SIZE>> {
    let bytes = hex::decode(iv_hex.trim()).context("IV is not valid hex")?;
    Block::<AES_BLOCK_SIZE>::try_from(bytes)
        .map_err(|bytes| anyhow!("IV must be {AES_BLOCK_SIZE} bytes, got {}", bytes.len()))
}

fn print_plaintext(plaintext: &[u8]) {
    println!("{}", String::from_utf8_lossy(plaintext));
    println!("hex: {}", hex::encode(plaintext));
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn attack_requires_an_oracle() {
        let result = Cli::try_parse_from([
            "padding-oracle",
            "attack",
            "--iv",
            "00",
            "--ciphertext",
            "00",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn tuning_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "padding-oracle",
            "demo",
            "--which",
            "v1",
            "--sequential",
            "--parallel-scan",
            "--retries",
            "7",
        ])
        .unwrap();

        let Command::Demo { tuning, .. } = cli.command else {
            panic!("expected demo command");
        };
        let config = tuning.config();
        assert!(!config.parallel_blocks);
        assert_eq!(config.scan, ScanStrategy::Parallel);
        assert_eq!(config.retries, 7);
    }

    #[test]
    fn parse_iv_checks_length() {
        assert!(parse_iv("00").is_err());
        assert_eq!(parse_iv(&hex::encode([9u8; 16])).unwrap(), [9u8; 16]);
    }
}
