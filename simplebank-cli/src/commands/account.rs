//! Account command - manage an owner's accounts

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;
use simplebank_core::services::with_retry;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account in a currency
    Create {
        #[arg(long)]
        owner: String,
        /// USD, EUR or CAD
        #[arg(long)]
        currency: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one account
    Show {
        id: i64,
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the owner's accounts
    List {
        #[arg(long)]
        owner: String,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 5)]
        page_size: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an account with no ledger history
    Delete {
        id: i64,
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add funds
    Credit {
        id: i64,
        /// Amount, e.g. 12.50
        amount: String,
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Withdraw funds
    Debit {
        id: i64,
        /// Amount, e.g. 12.50
        amount: String,
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;
    let retry = &ctx.config.retry;
    match command {
        AccountCommands::Create { owner, currency, json } => {
            let account = ctx.account_service.create_account(&owner, &currency)?;
            if json {
                return output::json(&account);
            }
            output::success(&format!("Created {} account {} for {}", account.currency, account.id, owner));
        }
        AccountCommands::Show { id, owner, json } => {
            let account = ctx.account_service.get_account(&owner, id)?;
            if json {
                return output::json(&account);
            }
            println!("{}", output::accounts_table(std::slice::from_ref(&account)));
        }
        AccountCommands::List { owner, page, page_size, json } => {
            let accounts = ctx.account_service.list_accounts(&owner, page, page_size)?;
            if json {
                return output::json(&accounts);
            }
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }
            println!("{}", output::accounts_table(&accounts));
        }
        AccountCommands::Delete { id, owner, json } => {
            with_retry(retry, || ctx.account_service.delete_account(&owner, id))?;
            if json {
                return output::json(&serde_json::json!({ "deleted": id }));
            }
            output::success(&format!("Deleted account {}", id));
        }
        AccountCommands::Credit { id, amount, owner, json } => {
            let minor = output::parse_amount(&amount)?;
            let account = with_retry(retry, || ctx.account_service.credit(&owner, id, minor))?;
            if json {
                return output::json(&account);
            }
            output::success(&format!(
                "Account {} balance: {}",
                account.id,
                output::format_amount(account.balance, account.currency)
            ));
        }
        AccountCommands::Debit { id, amount, owner, json } => {
            let minor = output::parse_amount(&amount)?;
            let account = with_retry(retry, || ctx.account_service.debit(&owner, id, minor))?;
            if json {
                return output::json(&account);
            }
            output::success(&format!(
                "Account {} balance: {}",
                account.id,
                output::format_amount(account.balance, account.currency)
            ));
        }
    }
    Ok(())
}
