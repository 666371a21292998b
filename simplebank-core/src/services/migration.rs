//! Schema migrations
//!
//! Each embedded SQL file runs at most once per database, in its own
//! transaction together with the `sys_migrations` row that records it.

use std::collections::HashSet;

use chrono::Utc;
use duckdb::{params, Connection};
use tracing::{info, warn};

use crate::adapters::duckdb::format_timestamp;
use crate::domain::result::{Error, Result};
use crate::migrations::{BOOTSTRAP_MIGRATION, MIGRATIONS};

#[derive(Debug)]
pub struct MigrationResult {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    pub already_applied: usize,
}

/// Brings a connection's schema up to date
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        // sys_migrations itself comes from a migration
        if !self.has_migrations_table()? {
            let sql = MIGRATIONS
                .iter()
                .find(|(name, _)| *name == BOOTSTRAP_MIGRATION)
                .map(|(_, sql)| *sql)
                .ok_or_else(|| Error::database("bootstrap migration is not embedded"))?;
            self.apply(BOOTSTRAP_MIGRATION, sql)?;
            applied.push(BOOTSTRAP_MIGRATION.to_string());
        }

        let recorded = self.recorded()?;
        let already_applied = recorded.len().saturating_sub(applied.len());

        for (name, sql) in MIGRATIONS.iter().filter(|(name, _)| !recorded.contains(*name)) {
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    /// Names of embedded migrations not yet recorded
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = self.recorded()?;
        Ok(MIGRATIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }

    /// Recorded migration names, in order
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.recorded()?.into_iter().collect();
        names.sort();
        Ok(names)
    }

    fn has_migrations_table(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Empty when the bootstrap migration has not run yet
    fn recorded(&self) -> Result<HashSet<String>> {
        if !self.has_migrations_table()? {
            return Ok(HashSet::new());
        }
        let mut stmt = self.conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = HashSet::new();
        for name in rows {
            names.insert(name?);
        }
        Ok(names)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn.execute(
                "INSERT INTO sys_migrations (migration_name, applied_at) VALUES (?, CAST(? AS TIMESTAMP))",
                params![name, format_timestamp(Utc::now())],
            )
        });

        match outcome {
            Ok(_) => {
                self.conn.execute_batch("COMMIT")?;
                info!(migration = name, "applied migration");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    warn!(migration = name, error = %rollback_err, "rollback after failed migration failed");
                }
                Err(err.into())
            }
        }
    }
}
