#![forbid(unsafe_code)]
//! Append a payload to the ledger

use clap::Parser;
use colored::*;
use sealchain::cli::load_chain_from_config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The payload to seal into the next block
    payload: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (_config, chain) = load_chain_from_config()?;

    let block = chain.add_block(cli.payload)?;

    println!("{}", "✅ Block sealed".bright_green().bold());
    println!("  {} {}", "Height:".bright_white(), block.height);
    println!("  {} {}", "Hash:".bright_white(), block.hash.cyan());
    println!(
        "  {} {}",
        "Previous:".bright_white(),
        if block.previous_hash.is_empty() {
            "(genesis)".to_string()
        } else {
            block.previous_hash.clone()
        }
    );
    println!("  {} {}", "Timestamp:".bright_white(), block.timestamp);

    Ok(())
}
