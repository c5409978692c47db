//! Instance store - persisted due dates of a bill series.
//!
//! Instances are keyed by `(series_id, due_date)`. Deciding what to delete, keep,
//! and insert is done by the pure planning functions in this module over sets of
//! dates and ids; the async functions only read and write rows.

use crate::{
    entities::{BillInstance, bill_instance},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// What a schedule regeneration does to a series' instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerationPlan {
    /// Unpaid instances to remove
    pub delete: Vec<i64>,
    /// Due dates to materialize, ascending
    pub insert: Vec<NaiveDate>,
    /// Generated dates dropped because a paid instance already covers that day
    pub skipped_paid: Vec<NaiveDate>,
}

/// Plans a full regeneration: every unpaid instance goes, every generated date not
/// already settled by a paid instance comes back.
#[must_use]
pub fn plan_regeneration(
    existing: &[bill_instance::Model],
    paid_ids: &HashSet<i64>,
    generated: &[NaiveDate],
) -> RegenerationPlan {
    let (paid, unpaid): (Vec<_>, Vec<_>) =
        existing.iter().partition(|i| paid_ids.contains(&i.id));
    let paid_days: BTreeSet<NaiveDate> = paid.iter().map(|i| i.due_date).collect();
    let wanted: BTreeSet<NaiveDate> = generated.iter().copied().collect();

    RegenerationPlan {
        delete: unpaid.iter().map(|i| i.id).collect(),
        insert: wanted.difference(&paid_days).copied().collect(),
        skipped_paid: wanted.intersection(&paid_days).copied().collect(),
    }
}

/// Plans a forward extension: generated dates that have no instance yet, paid or not.
#[must_use]
pub fn plan_extension(existing: &[bill_instance::Model], generated: &[NaiveDate]) -> Vec<NaiveDate> {
    let present: BTreeSet<NaiveDate> = existing.iter().map(|i| i.due_date).collect();
    let wanted: BTreeSet<NaiveDate> = generated.iter().copied().collect();
    wanted.difference(&present).copied().collect()
}

/// Retrieves all instances of a series ordered by due date (earliest first).
pub async fn get_instances_for_series<C>(
    db: &C,
    series_id: i64,
) -> Result<Vec<bill_instance::Model>>
where
    C: ConnectionTrait,
{
    BillInstance::find()
        .filter(bill_instance::Column::SeriesId.eq(series_id))
        .order_by_asc(bill_instance::Column::DueDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves instances of several series ordered by series, then due date.
pub async fn get_instances_for_series_ids<C>(
    db: &C,
    series_ids: &[i64],
) -> Result<Vec<bill_instance::Model>>
where
    C: ConnectionTrait,
{
    if series_ids.is_empty() {
        return Ok(Vec::new());
    }
    BillInstance::find()
        .filter(bill_instance::Column::SeriesId.is_in(series_ids.iter().copied()))
        .order_by_asc(bill_instance::Column::SeriesId)
        .order_by_asc(bill_instance::Column::DueDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific instance by its unique ID.
pub async fn get_instance_by_id<C>(db: &C, instance_id: i64) -> Result<Option<bill_instance::Model>>
where
    C: ConnectionTrait,
{
    BillInstance::find_by_id(instance_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts one unpaid instance per date, all with the same amount.
///
/// # Errors
/// Returns `Error::Conflict` when a date is already taken for this series, which
/// only happens when another writer regenerated the series concurrently.
pub async fn create_instances<C>(
    db: &C,
    series_id: i64,
    dates: &[NaiveDate],
    amount: f64,
) -> Result<Vec<bill_instance::Model>>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let mut created = Vec::with_capacity(dates.len());
    for &due_date in dates {
        let instance = bill_instance::ActiveModel {
            series_id: Set(series_id),
            due_date: Set(due_date),
            amount: Set(amount),
            created_at: Set(now),
            ..Default::default()
        };
        let model = instance
            .insert(db)
            .await
            .map_err(|e| Error::conflict_on_unique(e, series_id))?;
        created.push(model);
    }
    debug!(
        "Created {} instances for series {}",
        created.len(),
        series_id
    );
    Ok(created)
}

/// Deletes the given instances, returning how many rows went away.
pub async fn delete_instances<C>(db: &C, instance_ids: &[i64]) -> Result<u64>
where
    C: ConnectionTrait,
{
    if instance_ids.is_empty() {
        return Ok(0);
    }
    let result = BillInstance::delete_many()
        .filter(bill_instance::Column::Id.is_in(instance_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes every instance of a series, paid or not.
pub async fn delete_all_instances_for_series<C>(db: &C, series_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = BillInstance::delete_many()
        .filter(bill_instance::Column::SeriesId.eq(series_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
