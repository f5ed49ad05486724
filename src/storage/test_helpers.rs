//! Shared test helpers for storage module tests.
//!
//! This module provides common utilities for database setup used across
//! storage, pipeline and poller unit tests.

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
#[cfg(test)]
use sqlx::SqlitePool;

#[cfg(test)]
use crate::storage::{run_migrations, SqliteSubmissionStore};

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution; a single connection
/// keeps every query on the same in-memory database.
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates a `SqliteSubmissionStore` over a fresh in-memory database.
#[cfg(test)]
pub async fn create_test_store() -> SqliteSubmissionStore {
    SqliteSubmissionStore::new(Arc::new(create_test_pool().await))
}
