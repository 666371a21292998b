//! Output formatting utilities

use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;
use serde::Serialize;

use simplebank_core::{Account, Currency, Entry, Transfer};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print any serializable value as pretty JSON
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render minor units as a decimal amount with its currency code
pub fn format_amount(minor_units: i64, currency: Currency) -> String {
    format!("{} {}", currency.to_decimal(minor_units), currency)
}

/// Parse a user-entered amount such as `12.5` into minor units
pub fn parse_amount(input: &str) -> Result<i64> {
    let value: Decimal = input.trim().parse()?;
    let Some(scaled) = value.checked_mul(Decimal::from(100)) else {
        bail!("amount {} is out of range", input);
    };
    if scaled.fract() != Decimal::ZERO {
        bail!("amount {} has more than two decimal places", input);
    }
    match i64::try_from(scaled) {
        Ok(minor) => Ok(minor),
        Err(_) => bail!("amount {} is out of range", input),
    }
}

pub fn accounts_table(accounts: &[Account]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Owner", "Currency", "Balance", "Created"]);
    for account in accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.owner.clone(),
            account.currency.to_string(),
            format_amount(account.balance, account.currency),
            account.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}

pub fn transfers_table(transfers: &[Transfer], currency: Option<Currency>) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "From", "To", "Amount", "Created"]);
    for transfer in transfers {
        let amount = match currency {
            Some(c) => format_amount(transfer.amount, c),
            None => transfer.amount.to_string(),
        };
        table.add_row(vec![
            transfer.id.to_string(),
            transfer.from_account_id.to_string(),
            transfer.to_account_id.to_string(),
            amount,
            transfer.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}

pub fn entries_table(entries: &[Entry], currency: Currency) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Account", "Amount", "Created"]);
    for entry in entries {
        let amount = format_amount(entry.amount, currency);
        let amount = if entry.amount < 0 {
            amount.red().to_string()
        } else {
            amount.green().to_string()
        };
        table.add_row(vec![
            entry.id.to_string(),
            entry.account_id.to_string(),
            amount,
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}
