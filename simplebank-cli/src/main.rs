//! SimpleBank CLI - a double-entry ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::{account, entries, status, transfer, user};
use simplebank_core::Status;

/// SimpleBank - accounts, transfers and a double-entry ledger
#[derive(Parser)]
#[command(name = "sbank", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Move funds between accounts
    Transfer {
        #[command(subcommand)]
        command: transfer::TransferCommands,
    },

    /// List ledger entries of an account
    Entries {
        account_id: i64,
        #[arg(long)]
        owner: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger summary
    Status {
        /// Also check double-entry integrity
        #[arg(long)]
        verify: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Exit code for a failed command
///
/// 2 when something referenced does not exist, 3 when the request was
/// rejected, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<simplebank_core::Error>().map(|e| e.status()) {
        Some(Status::ResourceMissing) => 2,
        Some(Status::RequestRejected) => 3,
        Some(Status::InternalFailure) | None => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::User { command } => user::run(command),
        Commands::Account { command } => account::run(command),
        Commands::Transfer { command } => transfer::run(command),
        Commands::Entries { account_id, owner, limit, offset, json } => {
            entries::run(account_id, &owner, limit, offset, json)
        }
        Commands::Status { verify, json } => status::run(verify, json),
    }
}
