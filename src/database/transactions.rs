// ABOUTME: Transaction management with RAII guards and retry patterns for workflow writes
// ABOUTME: Provides automatic rollback on drop and exponential backoff on SQLite lock contention
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Transaction management with RAII guards and retry patterns
//!
//! - `TransactionGuard`: wrapper that rolls back automatically unless committed
//! - `retry_transaction`: exponential backoff for lock and timeout recovery
//!
//! ## Example Usage
//!
//! ```text
//! async fn approve(db: &Database, id: RecommendationId) -> AppResult<()> {
//!     retry_transaction(|| async {
//!         let mut guard = db.begin().await?;
//!         sqlx::query("UPDATE recommendations ...").execute(guard.executor()?).await?;
//!         sqlx::query("UPDATE training_sessions ...").execute(guard.executor()?).await?;
//!         guard.commit().await
//!     }, 3).await
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::{Database, Transaction};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Retry a transactional unit of work if it fails on lock contention or timeout
///
/// Non-retryable errors (constraint violations, invalid transitions, missing
/// rows) are propagated immediately.
///
/// # Errors
/// * Returns the last error once `max_retries` attempts failed, or the first
///   non-retryable error
///
/// # Exponential Backoff
/// - Attempt 1: 20ms
/// - Attempt 2: 40ms
/// - Attempt 3: 80ms
pub async fn retry_transaction<F, Fut, T>(mut f: F, max_retries: u32) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempts = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if attempts >= max_retries {
                    error!(
                        attempts = attempts,
                        max_retries = max_retries,
                        error = %e,
                        "Transaction failed after max retries"
                    );
                    return Err(e);
                }

                if is_retryable_error(&e) {
                    let backoff_ms = 10 * (1 << attempts);
                    warn!(
                        attempt = attempts,
                        max_retries = max_retries,
                        backoff_ms = backoff_ms,
                        error = %e,
                        "Transaction failed with retryable error, retrying after backoff"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                } else {
                    debug!(
                        attempts = attempts,
                        error = %e,
                        "Transaction failed with non-retryable error"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Only storage errors are considered; domain errors never retry
fn is_retryable_error(error: &AppError) -> bool {
    if error.code != ErrorCode::DatabaseError {
        return false;
    }
    let error_lower = error.message.to_lowercase();

    if error_lower.contains("database is locked")
        || error_lower.contains("locked")
        || error_lower.contains("busy")
    {
        return true;
    }

    if error_lower.contains("timeout") || error_lower.contains("timed out") {
        return true;
    }

    // Constraint violations and everything unknown
    false
}

/// RAII guard for database transactions ensuring automatic rollback on drop
///
/// If an error occurs before `commit()`, the guard is dropped and the
/// transaction is rolled back by `SQLx`.
pub struct TransactionGuard<'c, DB: Database> {
    transaction: Option<Transaction<'c, DB>>,
    committed: bool,
}

impl<'c, DB: Database> TransactionGuard<'c, DB> {
    /// Wrap a transaction obtained from `pool.begin().await`
    #[must_use]
    pub fn new(transaction: Transaction<'c, DB>) -> Self {
        debug!("TransactionGuard created - transaction will auto-rollback if not committed");
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Commit the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already consumed or the commit fails
    pub async fn commit(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))?;
                self.committed = true;
                debug!("TransactionGuard committed successfully");
                Ok(())
            }
            None => Err(AppError::internal(
                "Transaction already consumed - cannot commit",
            )),
        }
    }

    /// Explicitly roll back the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback operation fails
    pub async fn rollback(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.rollback()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction rollback failed: {e}")))?;
                debug!("TransactionGuard rolled back explicitly");
                Ok(())
            }
            None => Err(AppError::internal(
                "Transaction already consumed - cannot rollback",
            )),
        }
    }

    /// Check if the transaction has been committed
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    /// Connection to run queries on inside the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the guard is used after commit or rollback
    pub fn executor(&mut self) -> AppResult<&mut <DB as Database>::Connection> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::internal("Transaction already consumed - guard used after commit/rollback")
        })
    }
}

impl<DB: Database> Drop for TransactionGuard<'_, DB> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            warn!(
                "TransactionGuard dropped without commit - transaction will be rolled back automatically"
            );
        }
    }
}

/// Type alias for `SQLite` transaction guard
pub type SqliteTransactionGuard<'c> = TransactionGuard<'c, sqlx::Sqlite>;
