//! Status command - ledger summary and integrity check

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(verify: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.status_service.summary()?;
    let report = if verify {
        Some(ctx.status_service.verify_integrity()?)
    } else {
        None
    };

    if json {
        return output::json(&serde_json::json!({
            "summary": summary,
            "integrity": report,
        }));
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Users", &summary.total_users.to_string()]);
    table.add_row(vec!["Accounts", &summary.total_accounts.to_string()]);
    table.add_row(vec!["Transfers", &summary.total_transfers.to_string()]);
    table.add_row(vec!["Entries", &summary.total_entries.to_string()]);
    println!("{}", table);

    if !summary.balances.is_empty() {
        println!();
        let mut balances = output::create_table();
        balances.set_header(vec!["Currency", "Accounts", "Total"]);
        for total in &summary.balances {
            balances.add_row(vec![
                total.currency.to_string(),
                total.accounts.to_string(),
                output::format_amount(total.total_balance, total.currency),
            ]);
        }
        println!("{}", balances);
    }

    if let Some(report) = report {
        println!();
        if report.is_healthy() {
            output::success("Ledger integrity: OK");
        } else {
            output::warning("Ledger integrity: PROBLEMS FOUND");
            println!("  Entry sum: {}", report.entry_sum);
            println!(
                "  Entries: {} (expected {})",
                report.entry_count,
                report.transfer_count * 2
            );
            if !report.orphaned_entries.is_empty() {
                println!("  Orphaned entries: {:?}", report.orphaned_entries);
            }
            if !report.mismatched_accounts.is_empty() {
                println!("  Accounts out of balance: {:?}", report.mismatched_accounts);
            }
        }
    }

    Ok(())
}
