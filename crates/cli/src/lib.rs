pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "securebank",
    about = "SecureBank assistant CLI",
    long_about = "Chat with the SecureBank assistant in the terminal, inspect configuration, and run end-to-end flow checks.",
    after_help = "Examples:\n  securebank chat\n  securebank chat --json --no-latency --seed 7\n  securebank config\n  securebank smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session on stdin/stdout")]
    Chat {
        #[arg(long, help = "Emit each agent message as a JSON line")]
        json: bool,
        #[arg(long, help = "Disable simulated backend latency")]
        no_latency: bool,
        #[arg(long, value_name = "N", help = "Seed the simulated backend for reproducible replies")]
        seed: Option<u64>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Drive every conversation flow end to end with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { json, no_latency, seed } => {
            commands::chat::run(commands::chat::ChatOptions { json, no_latency, seed })
        }
        Command::Config => commands::CommandResult { exit_code: 0, output: commands::config::run() },
        Command::Smoke => commands::smoke::run(),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
