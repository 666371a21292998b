//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use simplebank_core::adapters::duckdb::DuckDbStore;
use simplebank_core::config::Config;
use simplebank_core::services::RetryPolicy;
use simplebank_core::{Account, Currency, LedgerStore, NewUser, OverdraftPolicy, SimplebankContext};

/// Fixed seed so failures reproduce
pub const SEED: u64 = 0x5EED_BA4C;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

/// In-memory context with the given overdraft policy
pub fn context(policy: OverdraftPolicy) -> SimplebankContext {
    let store = DuckDbStore::open_in_memory().unwrap();
    store.ensure_schema().unwrap();
    let config = Config::default().with_overdraft_policy(policy);
    SimplebankContext::from_store(config, Arc::new(store))
}

/// Retry policy generous enough to outlast write-write conflicts between a
/// handful of threads
pub fn contention_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 200,
        initial_delay_ms: 1,
        max_delay_ms: 20,
    }
}

pub fn random_username(rng: &mut StdRng) -> String {
    let suffix: u32 = rng.gen_range(0..1_000_000);
    format!("user_{:06}", suffix)
}

/// Create a fresh owner plus an account funded with `balance`
pub fn funded_account(store: &DuckDbStore, rng: &mut StdRng, currency: Currency, balance: i64) -> Account {
    let mut username = random_username(rng);
    while store.get_user(&username).is_ok() {
        username = random_username(rng);
    }
    store
        .create_user(&NewUser {
            username: username.clone(),
            hashed_password: "c2FsdA==$aGFzaA==".to_string(),
            full_name: "Test Owner".to_string(),
            email: format!("{}@example.com", username),
        })
        .unwrap();
    let account = store.create_account(&username, currency).unwrap();
    if balance == 0 {
        account
    } else {
        store.add_account_balance(account.id, balance).unwrap()
    }
}

pub fn balance(store: &DuckDbStore, account_id: i64) -> i64 {
    store.get_account(account_id).unwrap().balance
}
