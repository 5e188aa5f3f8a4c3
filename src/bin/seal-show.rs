#![forbid(unsafe_code)]
//! Display ledger blocks as a table

use chrono::{TimeZone, Utc};
use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use sealchain::blockchain::Block;
use sealchain::cli::load_chain_from_config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show only the block at this height
    #[arg(long)]
    height: Option<u64>,
}

fn shorten(hash: &str) -> String {
    if hash.is_empty() {
        "-".to_string()
    } else if hash.chars().count() > 16 {
        format!("{}...", hash.chars().take(13).collect::<String>())
    } else {
        hash.to_string()
    }
}

fn format_time(timestamp: u64) -> String {
    Utc.timestamp_opt(timestamp as i64, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (_config, chain) = load_chain_from_config()?;

    let blocks: Vec<Block> = match cli.height {
        Some(height) => vec![chain.get_block(height)?],
        None => chain.blocks()?,
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Height").add_attribute(Attribute::Bold),
            Cell::new("Time (UTC)").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
            Cell::new("Previous").add_attribute(Attribute::Bold),
            Cell::new("Payload").add_attribute(Attribute::Bold),
        ]);

    for block in &blocks {
        table.add_row(vec![
            Cell::new(block.height),
            Cell::new(format_time(block.timestamp)),
            Cell::new(shorten(&block.hash)),
            Cell::new(shorten(&block.previous_hash)),
            Cell::new(&block.payload),
        ]);
    }

    println!("{}", table);
    println!(
        "{}",
        format!("📦 {} block(s) shown", blocks.len()).bright_cyan()
    );

    Ok(())
}
