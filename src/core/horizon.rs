//! Horizon refresh - keeps materialized instances reaching one horizon ahead.
//!
//! The horizon moves forward with the calendar, so series created months ago run
//! out of instances unless they are extended. The refresh only ever inserts: it
//! generates each active series over the new horizon and adds the dates that have
//! no instance yet. The last refresh day is stored in the `system_state` table so
//! the job runs at most once per day.

use crate::{
    config::engine::EngineSettings,
    core::{instance, patch::ScheduleFields, schedule, series},
    entities::{BillSeries, SystemState, bill_series, system_state},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

const LAST_HORIZON_REFRESH_KEY: &str = "last_horizon_refresh";

/// Instances added to one series by a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesExtension {
    /// Series that was extended
    pub series_id: i64,
    /// Name of the series
    pub series_name: String,
    /// Number of instances inserted
    pub created: usize,
}

/// Outcome of a horizon refresh over all active series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonRefreshResult {
    /// Series that received at least one instance
    pub extended: Vec<SeriesExtension>,
    /// Number of active series examined
    pub total_series_processed: usize,
    /// Total instances inserted
    pub total_created: usize,
    /// Horizon the series were extended to
    pub horizon: NaiveDate,
    /// Day the refresh ran
    pub refresh_date: NaiveDate,
}

/// True when no refresh has been recorded for `today`.
pub async fn is_horizon_refresh_needed<C>(db: &C, today: NaiveDate) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_last_horizon_refresh_date(db)
        .await?
        .is_none_or(|last| last < today))
}

/// Retrieves the day of the last horizon refresh from the `system_state` table.
pub async fn get_last_horizon_refresh_date<C>(db: &C) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_HORIZON_REFRESH_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => NaiveDate::parse_from_str(&s.value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last horizon refresh date: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_horizon_refresh_date<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    let date_str = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_HORIZON_REFRESH_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(date_str);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_HORIZON_REFRESH_KEY.to_string()),
            value: Set(date_str),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Inserts the instances of `series` that fall on or before `horizon` and do not
/// exist yet. Returns how many were inserted.
pub async fn extend_series<C>(db: &C, series: &bill_series::Model, horizon: NaiveDate) -> Result<usize>
where
    C: ConnectionTrait,
{
    let schedule = ScheduleFields::from_series(series)?;
    let generated = schedule::generate(
        schedule.start_date,
        schedule.recurrence,
        horizon,
        schedule.last_payment_date,
    );
    let existing = instance::get_instances_for_series(db, series.id).await?;
    let missing = instance::plan_extension(&existing, &generated);
    let created =
        instance::create_instances(db, series.id, &missing, schedule.estimated_amount).await?;
    Ok(created.len())
}

/// Extends a single series to `horizon` in its own transaction.
///
/// # Errors
/// Returns `Error::SeriesNotFound` if the series does not exist.
pub async fn extend_series_horizon(
    db: &DatabaseConnection,
    series_id: i64,
    horizon: NaiveDate,
) -> Result<usize> {
    let txn = db.begin().await?;
    let found = series::get_series(&txn, series_id).await?;
    let created = extend_series(&txn, &found, horizon).await?;
    txn.commit().await?;
    Ok(created)
}

/// Extends every non-archived series to the horizon implied by `today`.
///
/// Returns `Ok(None)` when a refresh was already recorded for `today`. All
/// insertions and the bookkeeping row commit together.
#[instrument(skip(db, settings))]
pub async fn refresh_horizons(
    db: &DatabaseConnection,
    today: NaiveDate,
    settings: &EngineSettings,
) -> Result<Option<HorizonRefreshResult>> {
    if !is_horizon_refresh_needed(db, today).await? {
        return Ok(None);
    }

    let horizon = settings.horizon_from(today);
    let txn = db.begin().await?;

    let active = BillSeries::find()
        .filter(bill_series::Column::IsArchived.eq(false))
        .all(&txn)
        .await?;

    let mut extended = Vec::new();
    for s in &active {
        let created = extend_series(&txn, s, horizon).await?;
        if created > 0 {
            extended.push(SeriesExtension {
                series_id: s.id,
                series_name: s.name.clone(),
                created,
            });
        }
    }

    set_last_horizon_refresh_date(&txn, today).await?;
    txn.commit().await?;

    let total_created = extended.iter().map(|e| e.created).sum();
    info!(
        "Horizon refresh to {}: {} series checked, {} extended, {} instances created",
        horizon,
        active.len(),
        extended.len(),
        total_created
    );

    Ok(Some(HorizonRefreshResult {
        extended,
        total_series_processed: active.len(),
        total_created,
        horizon,
        refresh_date: today,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        payment::record_payment,
        series::{archive_series, create_series},
    };
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_refresh_bookkeeping() -> Result<()> {
        let db = setup_test_db().await?;
        let today = date(2026, 6, 1);

        assert!(get_last_horizon_refresh_date(&db).await?.is_none());
        assert!(is_horizon_refresh_needed(&db, today).await?);

        let first = refresh_horizons(&db, today, &EngineSettings::default()).await?;
        assert!(first.is_some());
        assert_eq!(get_last_horizon_refresh_date(&db).await?, Some(today));
        assert!(!is_horizon_refresh_needed(&db, today).await?);

        // Same day: nothing to do
        assert!(refresh_horizons(&db, today, &EngineSettings::default()).await?.is_none());

        // Next day: runs again and overwrites the stored day
        let tomorrow = date(2026, 6, 2);
        assert!(is_horizon_refresh_needed(&db, tomorrow).await?);
        refresh_horizons(&db, tomorrow, &EngineSettings::default()).await?;
        assert_eq!(get_last_horizon_refresh_date(&db).await?, Some(tomorrow));

        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_extends_active_series_only() -> Result<()> {
        let db = setup_test_db().await?;
        // Both series materialized through 2026-12-31
        let rent = create_test_series(&db, "Rent").await?;
        let gym = create_test_series(&db, "Gym").await?;
        archive_series(&db, gym.id, true, test_horizon()).await?;

        let first = instance::get_instances_for_series(&db, rent.id).await?[0].clone();
        record_payment(&db, first.id, test_payment(first.due_date, 50.0)).await?;

        let settings = EngineSettings {
            horizon_months: 6,
            ..EngineSettings::default()
        };
        let result = refresh_horizons(&db, date(2026, 9, 15), &settings)
            .await?
            .unwrap();

        // Horizon 2027-03-15 adds Jan, Feb and Mar 2027
        assert_eq!(result.horizon, date(2027, 3, 15));
        assert_eq!(result.total_series_processed, 1);
        assert_eq!(result.total_created, 3);
        assert_eq!(result.extended.len(), 1);
        assert_eq!(result.extended[0].series_id, rent.id);

        let rent_instances = instance::get_instances_for_series(&db, rent.id).await?;
        assert_eq!(rent_instances.len(), 15);
        assert_eq!(rent_instances[0], first);
        assert_eq!(rent_instances[14].due_date, date(2027, 3, 1));
        assert_eq!(instance::get_instances_for_series(&db, gym.id).await?.len(), 12);

        Ok(())
    }

    #[tokio::test]
    async fn test_extend_respects_cutoff_and_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new = test_new_series("Loan");
        new.last_payment_date = Some(date(2027, 1, 15));
        let loan = create_series(&db, new, test_horizon()).await?.series;

        assert_eq!(extend_series_horizon(&db, loan.id, date(2027, 12, 31)).await?, 1);
        assert_eq!(extend_series_horizon(&db, loan.id, date(2027, 12, 31)).await?, 0);
        assert_eq!(instance::get_instances_for_series(&db, loan.id).await?.len(), 13);

        assert!(matches!(
            extend_series_horizon(&db, 999, date(2027, 12, 31)).await,
            Err(Error::SeriesNotFound { id: 999 })
        ));

        Ok(())
    }
}
