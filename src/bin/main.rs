#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "SealChain CLI".bright_cyan().bold());
    println!("{}", "-------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}", "seal-append".bright_white());
    println!("  - {}", "seal-show".bright_white());
    println!("  - {}", "seal-verify".bright_white());
    println!();
    println!("{}", "Configuration:".bright_green().underline());
    println!(
        "  Reads {} (or the file named by {}); defaults apply when absent.",
        sealchain::config::DEFAULT_CONFIG_PATH.bright_white(),
        sealchain::config::CONFIG_ENV_VAR.bright_white()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin seal-append -- \"hello ledger\"".italic());
}
