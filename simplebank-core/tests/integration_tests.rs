//! End-to-end tests over a file-backed ledger
//!
//! Run with: cargo test --test integration_tests -- --nocapture

mod common;

use tempfile::TempDir;

use simplebank_core::services::CreateUserRequest;
use simplebank_core::{Currency, Error, ErrorKind, OverdraftPolicy, SimplebankContext, DB_FILENAME};

fn register(ctx: &SimplebankContext, username: &str) {
    ctx.user_service
        .create_user(&CreateUserRequest {
            username: username.to_string(),
            password: "hunter22".to_string(),
            full_name: "Integration Tester".to_string(),
            email: format!("{}@example.com", username),
        })
        .unwrap();
}

#[test]
fn test_context_creates_database_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("bank");

    let (a_id, b_id) = {
        let ctx = SimplebankContext::new(&data_dir).unwrap();
        register(&ctx, "alice");
        register(&ctx, "bob");
        let a = ctx.account_service.create_account("alice", "USD").unwrap();
        let b = ctx.account_service.create_account("bob", "USD").unwrap();
        ctx.account_service.credit("alice", a.id, 1000).unwrap();
        ctx.transfer_service
            .create_transfer("alice", a.id, b.id, 250, "USD")
            .unwrap();
        (a.id, b.id)
    };
    assert!(data_dir.join(DB_FILENAME).exists());

    let ctx = SimplebankContext::new(&data_dir).unwrap();
    assert_eq!(ctx.account_service.get_account("alice", a_id).unwrap().balance, 750);
    assert_eq!(ctx.account_service.get_account("bob", b_id).unwrap().balance, 250);

    let summary = ctx.status_service.summary().unwrap();
    assert_eq!(summary.total_users, 2);
    assert_eq!(summary.total_transfers, 1);
    assert_eq!(summary.total_entries, 2);
    assert_eq!(summary.balances.len(), 1);
    assert_eq!(summary.balances[0].currency, Currency::Usd);
    assert_eq!(summary.balances[0].total_balance, 1000);
}

#[test]
fn test_settings_file_drives_policy() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{ "ledger": { "overdraftPolicy": "allow", "maxTransferAmount": 50 } }"#,
    )
    .unwrap();

    let ctx = SimplebankContext::new(temp_dir.path()).unwrap();
    assert_eq!(ctx.config.max_transfer_amount, 50);

    register(&ctx, "carol");
    register(&ctx, "dave");
    let c = ctx.account_service.create_account("carol", "EUR").unwrap();
    let d = ctx.account_service.create_account("dave", "EUR").unwrap();

    let err = ctx
        .transfer_service
        .create_transfer("carol", c.id, d.id, 51, "EUR")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // Overdraft allowed unless the environment overrides it
    if std::env::var("SIMPLEBANK_OVERDRAFT").is_err() {
        assert_eq!(ctx.config.overdraft_policy, OverdraftPolicy::Allow);
        let result = ctx
            .transfer_service
            .create_transfer("carol", c.id, d.id, 50, "EUR")
            .unwrap();
        assert_eq!(result.from_account.balance, -50);
    }
}

#[test]
fn test_account_requires_registered_owner() {
    let ctx = common::context(OverdraftPolicy::Reject);
    let err = ctx.account_service.create_account("nobody", "USD").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[test]
fn test_one_account_per_currency() {
    let ctx = common::context(OverdraftPolicy::Reject);
    register(&ctx, "erin");
    ctx.account_service.create_account("erin", "CAD").unwrap();

    let err = ctx.account_service.create_account("erin", "cad").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[test]
fn test_account_paging_by_owner() {
    let ctx = common::context(OverdraftPolicy::Reject);
    register(&ctx, "frank");
    register(&ctx, "grace");

    let mut ids = Vec::new();
    for currency in Currency::ALL {
        ids.push(ctx.account_service.create_account("frank", currency.as_str()).unwrap().id);
        ctx.account_service.create_account("grace", currency.as_str()).unwrap();
    }

    let page = ctx.account_service.list_accounts("frank", 1, 5).unwrap();
    let page_ids: Vec<i64> = page.iter().map(|a| a.id).collect();
    assert_eq!(page_ids, ids);
    assert!(page.iter().all(|a| a.owner == "frank"));
}

#[test]
fn test_transfer_request_from_foreign_account() {
    let ctx = common::context(OverdraftPolicy::Reject);
    register(&ctx, "heidi");
    register(&ctx, "ivan");
    let h = ctx.account_service.create_account("heidi", "USD").unwrap();
    let i = ctx.account_service.create_account("ivan", "USD").unwrap();
    ctx.account_service.credit("heidi", h.id, 500).unwrap();

    let err = ctx
        .transfer_service
        .create_transfer("ivan", h.id, i.id, 100, "USD")
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert_eq!(err.status(), simplebank_core::Status::RequestRejected);
}
