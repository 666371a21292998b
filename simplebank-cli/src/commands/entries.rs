//! Entries command - show an account's ledger lines

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(account_id: i64, owner: &str, limit: i64, offset: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.account_service.get_account(owner, account_id)?;
    let entries = ctx.transfer_service.list_entries(account_id, limit, offset)?;

    if json {
        return output::json(&entries);
    }
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }
    println!("{}", output::entries_table(&entries, account.currency));
    Ok(())
}
