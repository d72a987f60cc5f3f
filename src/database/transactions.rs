// ABOUTME: Transaction management with RAII guards and lock-contention retry for SQLite writes
// ABOUTME: Series commits run inside a guard and are retried when the database is busy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Transaction helpers for the analytics store.
//!
//! Every multi-row write (fact upserts, the per-workout series commit, active
//! workout events) goes through a [`TransactionGuard`]. The series commit is also
//! wrapped in [`retry_transaction`] because concurrent aggregation workers contend
//! for the single SQLite writer lock.

use std::future::Future;
use std::time::Duration;

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Attempts used for lock contention inside a single commit
pub const DEFAULT_LOCK_RETRIES: u32 = 5;

/// First backoff step; doubles per attempt
const LOCK_BACKOFF_BASE_MS: u64 = 20;

/// SQLite messages that mean "try again later"
const TRANSIENT_MARKERS: &[&str] = &["database is locked", "database is busy", "sqlite_busy", "timed out"];

/// Run `f` until it succeeds, retrying only while the store reports lock contention.
///
/// Backoff is 20, 40, 80, 160ms. Anything other than a transient `DatabaseError`
/// is returned on the first failure.
///
/// # Errors
///
/// Returns the last error once `max_attempts` are spent, or the first
/// non-transient error
pub async fn retry_transaction<F, Fut, T>(mut f: F, max_attempts: u32) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match f().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !is_lock_contention(&error) {
            return Err(error);
        }
        if attempt >= max_attempts {
            error!(attempt, error = %error, "Store still locked after final attempt");
            return Err(error);
        }

        let backoff_ms = LOCK_BACKOFF_BASE_MS << (attempt - 1);
        warn!(attempt, backoff_ms, error = %error, "Store locked, retrying transaction");
        sleep(Duration::from_millis(backoff_ms)).await;
    }
}

/// Whether an error is a transient SQLite lock or busy condition
fn is_lock_contention(error: &AppError) -> bool {
    if error.code != ErrorCode::DatabaseError {
        return false;
    }
    let message = error.message.to_lowercase();
    !message.contains("constraint") && TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// SQLite transaction that rolls back unless [`commit`](Self::commit) is called
pub struct TransactionGuard<'c> {
    transaction: Option<Transaction<'c, Sqlite>>,
}

impl<'c> TransactionGuard<'c> {
    /// Wrap a transaction obtained from `pool.begin().await`
    #[must_use]
    pub const fn new(transaction: Transaction<'c, Sqlite>) -> Self {
        Self {
            transaction: Some(transaction),
        }
    }

    /// Commit and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed or the commit fails
    pub async fn commit(mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed - cannot commit"))?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))
    }

    /// Roll back and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed or the rollback fails
    pub async fn rollback(mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed - cannot rollback"))?;
        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Transaction rollback failed: {e}")))?;
        debug!("Transaction rolled back");
        Ok(())
    }

    /// Connection for statements inside the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed
    pub fn executor(&mut self) -> AppResult<&mut SqliteConnection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::internal("Transaction used after commit or rollback"))
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            // sqlx rolls the transaction back when it is dropped
            debug!("Transaction dropped without commit, rolling back");
        }
    }
}
