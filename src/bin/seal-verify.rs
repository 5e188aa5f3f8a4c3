#![forbid(unsafe_code)]
//! Audit the whole ledger for tampering

use clap::Parser;
use colored::*;
use sealchain::blockchain::Finding;
use sealchain::cli::load_chain_from_config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Only print the offending heights
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (_config, chain) = load_chain_from_config()?;

    let audit = chain.audit_chain()?;

    if cli.quiet {
        for height in audit.error_heights() {
            println!("{}", height);
        }
    } else {
        let tip = audit
            .tip
            .map_or_else(|| "empty".to_string(), |t| t.to_string());
        println!("{} {}", "Chain tip:".bright_white(), tip);

        if audit.is_valid() {
            println!("{}", "✅ Chain is intact".bright_green().bold());
        } else {
            println!("{}", "❌ Chain integrity violated".red().bold());
            for finding in &audit.findings {
                let line = match finding {
                    Finding::HashMismatch(h) => format!("  height {}: stored hash does not match content", h),
                    Finding::BrokenLink(h) => format!("  height {}: hash does not match previous_hash of height {}", h, h + 1),
                    Finding::Unreadable(h) => format!("  height {}: stored bytes are not a valid block", h),
                };
                println!("{}", line.yellow());
            }
        }
    }

    if !audit.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}
