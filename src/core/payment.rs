//! Payment linkage - decides which instances are paid and whether a payment is near.
//!
//! An instance is paid as soon as at least one transaction carries its id in
//! `bill_instance_id`. Paid is terminal: nothing in the engine unlinks or edits
//! a paid instance. The nearby check is looser and only looks at transactions
//! tagged with the series, so an approximately-matching payment that was never
//! linked still suppresses a duplicate "create payment" prompt.

use crate::{
    core::instance,
    entities::{BillSeries, Transaction, bill_instance, transaction},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Default half-width of the nearby-transaction window, in days.
pub const DEFAULT_NEARBY_WINDOW_DAYS: i64 = 7;

/// A settled payment to record against an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    /// Account the money left
    pub account_id: i64,
    /// Amount actually paid
    pub amount: f64,
    /// Day the payment was made
    pub date: NaiveDate,
    /// Free-form description
    pub description: String,
}

/// Returns the ids among `instance_ids` that have at least one linked transaction.
pub async fn get_paid_ids_among<C>(db: &C, instance_ids: &[i64]) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    if instance_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let linked = Transaction::find()
        .filter(transaction::Column::BillInstanceId.is_in(instance_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(linked.into_iter().filter_map(|t| t.bill_instance_id).collect())
}

/// Returns the ids of every paid instance of a series.
pub async fn get_paid_instance_ids<C>(db: &C, series_id: i64) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = instance::get_instances_for_series(db, series_id)
        .await?
        .iter()
        .map(|i| i.id)
        .collect();
    get_paid_ids_among(db, &ids).await
}

/// Whether the instance has at least one linked transaction.
pub async fn is_paid<C>(db: &C, instance_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let linked = Transaction::find()
        .filter(transaction::Column::BillInstanceId.eq(instance_id))
        .count(db)
        .await?;
    Ok(linked > 0)
}

/// Earliest due date among instances that are not in `paid_ids`.
#[must_use]
pub fn earliest_unpaid(
    instances: &[bill_instance::Model],
    paid_ids: &HashSet<i64>,
) -> Option<NaiveDate> {
    instances
        .iter()
        .filter(|i| !paid_ids.contains(&i.id))
        .map(|i| i.due_date)
        .min()
}

/// The next date the series expects a payment: its earliest unpaid instance, which
/// may already be overdue. `None` when every instance is paid or none exist.
pub async fn next_occurrence<C>(db: &C, series_id: i64) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let instances = instance::get_instances_for_series(db, series_id).await?;
    let ids: Vec<i64> = instances.iter().map(|i| i.id).collect();
    let paid = get_paid_ids_among(db, &ids).await?;
    Ok(earliest_unpaid(&instances, &paid))
}

/// Inclusive `[due - window, due + window]`, clamped to the calendar.
#[must_use]
pub fn nearby_window(due_date: NaiveDate, window_days: i64) -> (NaiveDate, NaiveDate) {
    let width = Days::new(window_days.unsigned_abs());
    (
        due_date.checked_sub_days(width).unwrap_or(NaiveDate::MIN),
        due_date.checked_add_days(width).unwrap_or(NaiveDate::MAX),
    )
}

/// Whether any of `payment_dates` falls within `window_days` of `due_date`.
#[must_use]
pub fn is_within_window(due_date: NaiveDate, payment_dates: &[NaiveDate], window_days: i64) -> bool {
    let (from, to) = nearby_window(due_date, window_days);
    payment_dates.iter().any(|d| (from..=to).contains(d))
}

/// Whether a transaction tagged with the instance's series is dated within
/// `window_days` of the instance's due date, linked to this instance or not.
pub async fn has_nearby_transaction<C>(
    db: &C,
    occurrence: &bill_instance::Model,
    window_days: i64,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let (from, to) = nearby_window(occurrence.due_date, window_days);
    let nearby = Transaction::find()
        .filter(transaction::Column::SeriesId.eq(occurrence.series_id))
        .filter(transaction::Column::Date.between(from, to))
        .count(db)
        .await?;
    Ok(nearby > 0)
}

/// Records a settled transaction linked to the instance, marking it paid.
///
/// # Errors
/// Returns `Error::InvalidAmount` for a non-positive or non-finite amount and
/// `Error::InstanceNotFound` when the instance does not exist.
#[instrument(skip(db, payment))]
pub async fn record_payment(
    db: &DatabaseConnection,
    instance_id: i64,
    payment: NewPayment,
) -> Result<transaction::Model> {
    if !payment.amount.is_finite() || payment.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: payment.amount,
        });
    }

    let txn = db.begin().await?;

    let paid_instance = instance::get_instance_by_id(&txn, instance_id)
        .await?
        .ok_or(Error::InstanceNotFound { id: instance_id })?;
    let series = BillSeries::find_by_id(paid_instance.series_id)
        .one(&txn)
        .await?
        .ok_or(Error::SeriesNotFound {
            id: paid_instance.series_id,
        })?;

    let record = transaction::ActiveModel {
        budget_id: Set(series.budget_id),
        account_id: Set(payment.account_id),
        series_id: Set(Some(series.id)),
        bill_instance_id: Set(Some(paid_instance.id)),
        amount: Set(payment.amount),
        description: Set(payment.description),
        date: Set(payment.date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = record.insert(&txn).await?;

    txn.commit().await?;

    info!(
        "Recorded payment {} of ${:.2} for instance {} (series {}) due {}",
        created.id, created.amount, paid_instance.id, series.id, paid_instance.due_date
    );
    Ok(created)
}
