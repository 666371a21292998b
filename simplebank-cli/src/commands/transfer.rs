//! Transfer command - move funds and inspect transfers

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_context;
use crate::output;
use simplebank_core::services::with_retry;

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Move funds from one of the owner's accounts to another account
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
        /// Amount, e.g. 12.50
        #[arg(long)]
        amount: String,
        /// Currency both accounts must hold
        #[arg(long)]
        currency: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transfer into or out of one of the owner's accounts
    Show {
        id: i64,
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List transfers into or out of an account
    List {
        #[arg(long)]
        account: i64,
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
}

pub fn run(command: TransferCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        TransferCommands::Create { owner, from, to, amount, currency, json } => {
            let minor = output::parse_amount(&amount)?;
            let result = with_retry(&ctx.config.retry, || {
                ctx.transfer_service
                    .create_transfer(&owner, from, to, minor, &currency)
            })?;
            if json {
                return output::json(&result);
            }

            let c = result.from_account.currency;
            output::success(&format!(
                "Transfer {}: {} from account {} to account {}",
                result.transfer.id,
                output::format_amount(result.transfer.amount, c),
                result.from_account.id,
                result.to_account.id
            ));
            println!(
                "  {} balance: {}",
                result.from_account.id,
                output::format_amount(result.from_account.balance, c).bold()
            );
            println!(
                "  {} balance: {}",
                result.to_account.id,
                output::format_amount(result.to_account.balance, c).bold()
            );
        }
        TransferCommands::Show { id, owner, json } => {
            let transfer = ctx.transfer_service.get_transfer_for_owner(&owner, id)?;
            if json {
                return output::json(&transfer);
            }
            println!("{}", output::transfers_table(std::slice::from_ref(&transfer), None));
        }
        TransferCommands::List { account, owner, limit, offset, json } => {
            let owned = ctx.account_service.get_account(&owner, account)?;
            let transfers = ctx
                .transfer_service
                .list_transfers(account, account, limit, offset)?;
            if json {
                return output::json(&transfers);
            }
            if transfers.is_empty() {
                println!("No transfers found.");
                return Ok(());
            }
            println!("{}", output::transfers_table(&transfers, Some(owned.currency)));
        }
    }
    Ok(())
}
