//! Bill series reconciliation - creates, updates, archives and deletes series while
//! keeping their instances consistent with the schedule.
//!
//! Every write runs in one database transaction. A schedule change deletes the
//! series' unpaid instances and regenerates them from the new schedule, skipping
//! days already covered by a paid instance. If any step fails the transaction is
//! dropped and the series keeps its previous instances. Paid instances are never
//! touched by an update.

use crate::{
    core::{
        category::{self, CategoryRef},
        instance,
        patch::{self, CategoryAssignment, Patch, ScheduleFields, SeriesPatch, SplitInput},
        payment,
        schedule::{self, Recurrence, RecurrenceType},
    },
    entities::{BillSeries, BillSplit, Transaction, bill_instance, bill_series, bill_split, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    Condition, DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Allowed difference between the split total and the estimated amount.
const SPLIT_TOLERANCE: f64 = 0.005;

/// Everything needed to create a bill series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSeries {
    /// Owning budget
    pub budget_id: i64,
    /// Display name
    pub name: String,
    /// Who gets paid
    pub recipient: String,
    /// Paying account
    pub account_id: i64,
    /// Category or split breakdown
    pub category: CategoryAssignment,
    /// First due date
    pub start_date: NaiveDate,
    /// How often the bill repeats
    pub recurrence_type: RecurrenceType,
    /// Interval in days, only for `Custom`
    pub custom_interval_days: Option<i32>,
    /// Expected amount of each occurrence
    pub estimated_amount: f64,
    /// Inclusive cutoff
    pub last_payment_date: Option<NaiveDate>,
}

/// A series together with its splits and instances, as committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    /// The series row
    pub series: bill_series::Model,
    /// Splits in position order, empty for a single-category series
    pub splits: Vec<bill_split::Model>,
    /// Instances ordered by due date
    pub instances: Vec<bill_instance::Model>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: "Bill name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Checks split amounts against the estimated amount.
///
/// # Errors
/// Returns `Error::Config` when there are no splits, a split amount is not
/// positive, or the total is off by more than half a cent.
pub fn validate_split_amounts(amounts: &[f64], estimated_amount: f64) -> Result<()> {
    if amounts.is_empty() {
        return Err(Error::Config {
            message: "A bill needs a category or at least one split".to_string(),
        });
    }
    if let Some(bad) = amounts.iter().find(|a| !a.is_finite() || **a <= 0.0) {
        return Err(Error::Config {
            message: format!("Split amount must be positive, got {bad}"),
        });
    }
    let total: f64 = amounts.iter().sum();
    if (total - estimated_amount).abs() > SPLIT_TOLERANCE {
        return Err(Error::Config {
            message: format!(
                "Splits add up to {total:.2} but the estimated amount is {estimated_amount:.2}"
            ),
        });
    }
    Ok(())
}

fn validate_assignment(assignment: &CategoryAssignment, estimated_amount: f64) -> Result<()> {
    match assignment {
        CategoryAssignment::Single(_) => Ok(()),
        CategoryAssignment::Split(splits) => {
            let amounts: Vec<f64> = splits.iter().map(|s| s.amount).collect();
            validate_split_amounts(&amounts, estimated_amount)
        }
    }
}

/// Resolves the assignment's categories, replaces the stored splits, and returns
/// the single category id (`None` for a split bill).
async fn store_assignment(
    txn: &DatabaseTransaction,
    series_id: i64,
    budget_id: i64,
    assignment: &CategoryAssignment,
) -> Result<Option<i64>> {
    BillSplit::delete_many()
        .filter(bill_split::Column::SeriesId.eq(series_id))
        .exec(txn)
        .await?;

    match assignment {
        CategoryAssignment::Single(reference) => {
            Ok(Some(category::resolve_category_ref(txn, budget_id, reference).await?))
        }
        CategoryAssignment::Split(splits) => {
            for (position, split) in splits.iter().enumerate() {
                insert_split(txn, series_id, budget_id, position, split).await?;
            }
            Ok(None)
        }
    }
}

async fn insert_split(
    txn: &DatabaseTransaction,
    series_id: i64,
    budget_id: i64,
    position: usize,
    split: &SplitInput,
) -> Result<bill_split::Model> {
    let category_id = category::resolve_category_ref(txn, budget_id, &split.category).await?;
    let position = i32::try_from(position).map_err(|_| Error::Config {
        message: "Too many splits".to_string(),
    })?;
    let model = bill_split::ActiveModel {
        series_id: Set(series_id),
        position: Set(position),
        subtitle: Set(split.subtitle.trim().to_string()),
        category_id: Set(category_id),
        amount: Set(split.amount),
        ..Default::default()
    };
    model.insert(txn).await.map_err(Into::into)
}

/// Retrieves a series by id.
///
/// # Errors
/// Returns `Error::SeriesNotFound` if it does not exist.
pub async fn get_series<C>(db: &C, series_id: i64) -> Result<bill_series::Model>
where
    C: ConnectionTrait,
{
    BillSeries::find_by_id(series_id)
        .one(db)
        .await?
        .ok_or(Error::SeriesNotFound { id: series_id })
}

/// Retrieves a series' splits in position order.
pub async fn get_series_splits<C>(db: &C, series_id: i64) -> Result<Vec<bill_split::Model>>
where
    C: ConnectionTrait,
{
    BillSplit::find()
        .filter(bill_split::Column::SeriesId.eq(series_id))
        .order_by_asc(bill_split::Column::Position)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all series of a budget ordered by name, optionally including archived ones.
pub async fn get_series_for_budget<C>(
    db: &C,
    budget_id: i64,
    include_archived: bool,
) -> Result<Vec<bill_series::Model>>
where
    C: ConnectionTrait,
{
    let mut query = BillSeries::find().filter(bill_series::Column::BudgetId.eq(budget_id));
    if !include_archived {
        query = query.filter(bill_series::Column::IsArchived.eq(false));
    }
    query
        .order_by_asc(bill_series::Column::Name)
        .order_by_asc(bill_series::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a series with its splits and instances.
pub async fn get_series_snapshot<C>(db: &C, series_id: i64) -> Result<SeriesSnapshot>
where
    C: ConnectionTrait,
{
    let series = get_series(db, series_id).await?;
    let splits = get_series_splits(db, series_id).await?;
    let instances = instance::get_instances_for_series(db, series_id).await?;
    Ok(SeriesSnapshot {
        series,
        splits,
        instances,
    })
}

/// Creates a series and materializes its instances up to `horizon`.
///
/// # Errors
/// - `Error::Config` for an empty name, invalid recurrence, or invalid splits
/// - `Error::InvalidAmount` for a non-positive estimated amount
/// - `Error::CategoryNotFound` for an unknown category id
#[instrument(skip(db, new), fields(budget_id = new.budget_id))]
pub async fn create_series(
    db: &DatabaseConnection,
    new: NewSeries,
    horizon: NaiveDate,
) -> Result<SeriesSnapshot> {
    let name = validate_name(&new.name)?;
    patch::validate_amount(new.estimated_amount)?;
    let recurrence = Recurrence::new(new.recurrence_type, new.custom_interval_days)?;
    validate_assignment(&new.category, new.estimated_amount)?;

    let txn = db.begin().await?;

    let now = chrono::Utc::now().naive_utc();
    let series = bill_series::ActiveModel {
        budget_id: Set(new.budget_id),
        name: Set(name),
        recipient: Set(new.recipient.trim().to_string()),
        account_id: Set(new.account_id),
        category_id: Set(None),
        start_date: Set(new.start_date),
        recurrence_type: Set(recurrence.kind().as_str().to_string()),
        custom_interval_days: Set(recurrence.custom_interval_days()),
        estimated_amount: Set(new.estimated_amount),
        last_payment_date: Set(new.last_payment_date),
        is_archived: Set(false),
        revision: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let category_id = store_assignment(&txn, series.id, new.budget_id, &new.category).await?;
    let series = if category_id.is_some() {
        let mut active: bill_series::ActiveModel = series.into();
        active.category_id = Set(category_id);
        active.update(&txn).await?
    } else {
        series
    };

    let dates = schedule::generate(
        new.start_date,
        recurrence,
        horizon,
        new.last_payment_date,
    );
    instance::create_instances(&txn, series.id, &dates, new.estimated_amount).await?;

    let snapshot = get_series_snapshot(&txn, series.id).await?;
    txn.commit().await?;

    info!(
        "Created bill series {} '{}' ({}) with {} instances through {}",
        snapshot.series.id,
        snapshot.series.name,
        recurrence.kind(),
        snapshot.instances.len(),
        horizon
    );
    Ok(snapshot)
}

/// Updates a series, regenerating its unpaid instances if the schedule changed.
///
/// # Errors
/// Same validation errors as [`create_series`], plus `Error::SeriesNotFound` and
/// `Error::Conflict` when another writer updated the series concurrently.
pub async fn update_series(
    db: &DatabaseConnection,
    series_id: i64,
    patch: SeriesPatch,
    horizon: NaiveDate,
) -> Result<SeriesSnapshot> {
    let current = get_series(db, series_id).await?;
    update_series_at_revision(db, series_id, current.revision, patch, horizon).await
}

/// Like [`update_series`], but only applies if the stored revision still equals
/// `expected_revision`.
///
/// # Errors
/// Returns `Error::Conflict` when the revision moved on.
#[instrument(skip(db, patch, horizon))]
pub async fn update_series_at_revision(
    db: &DatabaseConnection,
    series_id: i64,
    expected_revision: i64,
    patch: SeriesPatch,
    horizon: NaiveDate,
) -> Result<SeriesSnapshot> {
    let txn = db.begin().await?;

    let series = get_series(&txn, series_id).await?;
    let stored = ScheduleFields::from_series(&series)?;
    let (schedule, schedule_changed) = stored.changed_by(&patch)?;

    let name = match patch.name.as_ref() {
        Patch::Set(name) => Some(validate_name(name)?),
        Patch::Unset => None,
    };

    // Splits must still add up when only the amount changes
    match &patch.category {
        Patch::Set(assignment) => validate_assignment(assignment, schedule.estimated_amount)?,
        Patch::Unset if series.category_id.is_none() => {
            let amounts: Vec<f64> = get_series_splits(&txn, series_id)
                .await?
                .iter()
                .map(|s| s.amount)
                .collect();
            validate_split_amounts(&amounts, schedule.estimated_amount)?;
        }
        Patch::Unset => {}
    }

    let bumped = BillSeries::update_many()
        .col_expr(
            bill_series::Column::Revision,
            Expr::value(expected_revision + 1),
        )
        .filter(bill_series::Column::Id.eq(series_id))
        .filter(bill_series::Column::Revision.eq(expected_revision))
        .exec(&txn)
        .await?;
    if bumped.rows_affected == 0 {
        return Err(Error::Conflict { series_id });
    }

    let mut active: bill_series::ActiveModel = series.clone().into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Patch::Set(recipient) = patch.recipient.as_ref() {
        active.recipient = Set(recipient.trim().to_string());
    }
    if let Patch::Set(account_id) = patch.account_id {
        active.account_id = Set(account_id);
    }
    if let Patch::Set(archived) = patch.is_archived {
        active.is_archived = Set(archived);
    }
    if let Patch::Set(assignment) = &patch.category {
        active.category_id =
            Set(store_assignment(&txn, series_id, series.budget_id, assignment).await?);
    }
    active.start_date = Set(schedule.start_date);
    active.recurrence_type = Set(schedule.recurrence.kind().as_str().to_string());
    active.custom_interval_days = Set(schedule.recurrence.custom_interval_days());
    active.estimated_amount = Set(schedule.estimated_amount);
    active.last_payment_date = Set(schedule.last_payment_date);
    active.revision = Set(expected_revision + 1);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&txn).await?;

    if schedule_changed {
        regenerate(&txn, series_id, &schedule, horizon).await?;
    } else {
        debug!("Series {} schedule unchanged, instances untouched", series_id);
    }

    let snapshot = get_series_snapshot(&txn, series_id).await?;
    txn.commit().await?;

    info!(
        "Updated bill series {} (revision {}, schedule changed: {})",
        series_id, snapshot.series.revision, schedule_changed
    );
    Ok(snapshot)
}

/// Replaces the unpaid instances of a series with those of `schedule`.
async fn regenerate(
    txn: &DatabaseTransaction,
    series_id: i64,
    schedule: &ScheduleFields,
    horizon: NaiveDate,
) -> Result<()> {
    let existing = instance::get_instances_for_series(txn, series_id).await?;
    let ids: Vec<i64> = existing.iter().map(|i| i.id).collect();
    let paid = payment::get_paid_ids_among(txn, &ids).await?;

    let generated = schedule::generate(
        schedule.start_date,
        schedule.recurrence,
        horizon,
        schedule.last_payment_date,
    );
    let plan = instance::plan_regeneration(&existing, &paid, &generated);

    let deleted = instance::delete_instances(txn, &plan.delete).await?;
    let created =
        instance::create_instances(txn, series_id, &plan.insert, schedule.estimated_amount)
            .await?;

    info!(
        "Regenerated series {}: {} unpaid deleted, {} created, {} paid kept, {} dates already paid",
        series_id,
        deleted,
        created.len(),
        paid.len(),
        plan.skipped_paid.len()
    );
    Ok(())
}

/// Archives or unarchives a series. Instances are untouched.
pub async fn archive_series(
    db: &DatabaseConnection,
    series_id: i64,
    archived: bool,
    horizon: NaiveDate,
) -> Result<bill_series::Model> {
    let patch = SeriesPatch {
        is_archived: Patch::Set(archived),
        ..Default::default()
    };
    Ok(update_series(db, series_id, patch, horizon).await?.series)
}

/// Deletes a series with all its splits and instances, paid or unpaid.
///
/// Transactions that pointed at the series or its instances stay, with their
/// links cleared.
///
/// # Errors
/// Returns `Error::SeriesNotFound` if the series does not exist.
#[instrument(skip(db))]
pub async fn delete_series(db: &DatabaseConnection, series_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let series = get_series(&txn, series_id).await?;
    let instance_ids: Vec<i64> = instance::get_instances_for_series(&txn, series_id)
        .await?
        .iter()
        .map(|i| i.id)
        .collect();

    let mut linked = Condition::any().add(transaction::Column::SeriesId.eq(series_id));
    if !instance_ids.is_empty() {
        linked = linked.add(transaction::Column::BillInstanceId.is_in(instance_ids.iter().copied()));
    }
    let unlinked = Transaction::update_many()
        .col_expr(transaction::Column::SeriesId, Expr::value(None::<i64>))
        .col_expr(transaction::Column::BillInstanceId, Expr::value(None::<i64>))
        .filter(linked)
        .exec(&txn)
        .await?;

    let removed = instance::delete_all_instances_for_series(&txn, series_id).await?;
    BillSplit::delete_many()
        .filter(bill_split::Column::SeriesId.eq(series_id))
        .exec(&txn)
        .await?;
    series.delete(&txn).await?;

    txn.commit().await?;

    info!(
        "Deleted bill series {} with {} instances ({} transactions unlinked)",
        series_id, removed, unlinked.rows_affected
    );
    Ok(())
}

/// Convenience for callers that reference the series category by name.
#[must_use]
pub fn single_category(name: &str) -> CategoryAssignment {
    CategoryAssignment::Single(CategoryRef::Name(name.to_string()))
}
