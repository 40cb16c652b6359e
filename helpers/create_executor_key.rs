//! Executor Key Generation Tool
//!
//! Generates a fresh executor private key and prints it together with its address, ready to be
//! appended to `EXECUTOR_KEYS`. The address still has to be funded before the submitter can use
//! it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example create_executor_key -- --count 3
//! ```
use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use eyre::{ensure, Result};

/// Command line arguments for executor key generation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of keys to generate
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Only print the comma separated keys, for `EXECUTOR_KEYS`
    #[arg(long)]
    env: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.count > 0, "count must be at least 1");

    let signers: Vec<PrivateKeySigner> = (0..args.count).map(|_| PrivateKeySigner::random()).collect();

    if args.env {
        let keys: Vec<String> = signers
            .iter()
            .map(|signer| format!("0x{}", hex::encode(signer.to_bytes())))
            .collect();
        println!("EXECUTOR_KEYS={}", keys.join(","));
        return Ok(());
    }

    for signer in &signers {
        println!("address: {}", signer.address());
        println!("key:     0x{}", hex::encode(signer.to_bytes()));
    }
    Ok(())
}
