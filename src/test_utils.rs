//! Shared test utilities for `BillBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating bill series with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        category::CategoryRef,
        patch::SplitInput,
        payment::NewPayment,
        schedule::RecurrenceType,
        series::{self, NewSeries},
    },
    entities::{bill_series, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing_subscriber::EnvFilter;

/// Budget every test series belongs to unless a test says otherwise.
pub const TEST_BUDGET_ID: i64 = 1;

/// Shorthand for a calendar date in tests.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Horizon used by test series: the last day of 2026.
pub fn test_horizon() -> NaiveDate {
    date(2026, 12, 31)
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A series description with sensible defaults.
///
/// # Defaults
/// * `budget_id`: [`TEST_BUDGET_ID`]
/// * `category`: "Housing" by name
/// * `start_date`: 2026-01-01, monthly, no cutoff
/// * `estimated_amount`: 50.0
pub fn test_new_series(name: &str) -> NewSeries {
    NewSeries {
        budget_id: TEST_BUDGET_ID,
        name: name.to_string(),
        recipient: format!("{name} Co."),
        account_id: 1,
        category: series::single_category("Housing"),
        start_date: date(2026, 1, 1),
        recurrence_type: RecurrenceType::Monthly,
        custom_interval_days: None,
        estimated_amount: 50.0,
        last_payment_date: None,
    }
}

/// A split booked against a category named after its subtitle.
pub fn test_split(subtitle: &str, amount: f64) -> SplitInput {
    SplitInput {
        subtitle: subtitle.to_string(),
        category: CategoryRef::Name(subtitle.to_string()),
        amount,
    }
}

/// Creates a default monthly series materialized through [`test_horizon`].
pub async fn create_test_series(db: &DatabaseConnection, name: &str) -> Result<bill_series::Model> {
    Ok(series::create_series(db, test_new_series(name), test_horizon())
        .await?
        .series)
}

/// Sets up a complete test environment with one series.
/// Returns (db, series) with twelve unpaid instances from 2026-01-01 to 2026-12-01.
pub async fn setup_with_series() -> Result<(DatabaseConnection, bill_series::Model)> {
    init_test_tracing();
    let db = setup_test_db().await?;
    let series = create_test_series(&db, "Rent").await?;
    Ok((db, series))
}

/// A payment from account 1 with a fixed description.
pub fn test_payment(date: NaiveDate, amount: f64) -> NewPayment {
    NewPayment {
        account_id: 1,
        amount,
        date,
        description: "Test payment".to_string(),
    }
}

/// Inserts a transaction tagged with the series, optionally linked to an instance.
pub async fn insert_series_transaction(
    db: &DatabaseConnection,
    series: &bill_series::Model,
    date: NaiveDate,
    bill_instance_id: Option<i64>,
) -> Result<transaction::Model> {
    transaction::ActiveModel {
        budget_id: Set(series.budget_id),
        account_id: Set(series.account_id),
        series_id: Set(Some(series.id)),
        bill_instance_id: Set(bill_instance_id),
        amount: Set(series.estimated_amount),
        description: Set("Imported payment".to_string()),
        date: Set(date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

