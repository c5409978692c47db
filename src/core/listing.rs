//! Instance listing - all instances of a budget with their payment annotations.

use crate::{
    core::{instance, payment, series},
    entities::{Transaction, bill_instance, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// One instance as shown in a bill list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceOverview {
    /// The instance row
    pub instance: bill_instance::Model,
    /// Name of the owning series
    pub series_name: String,
    /// Recipient of the owning series
    pub recipient: String,
    /// Whether the owning series is archived
    pub series_archived: bool,
    /// At least one transaction is linked to this instance
    pub is_paid: bool,
    /// Earliest unpaid due date of the owning series
    pub next_occurrence: Option<NaiveDate>,
    /// A transaction tagged with the series is dated near this instance's due date
    pub has_nearby_transaction: bool,
}

/// Lists every instance in the budget ordered by due date, then series name.
///
/// Archived series are left out unless `include_archived` is set.
pub async fn list_instances<C>(
    db: &C,
    budget_id: i64,
    include_archived: bool,
    window_days: i64,
) -> Result<Vec<InstanceOverview>>
where
    C: ConnectionTrait,
{
    let all_series = series::get_series_for_budget(db, budget_id, include_archived).await?;
    let series_ids: Vec<i64> = all_series.iter().map(|s| s.id).collect();
    let instances = instance::get_instances_for_series_ids(db, &series_ids).await?;

    let instance_ids: Vec<i64> = instances.iter().map(|i| i.id).collect();
    let paid = payment::get_paid_ids_among(db, &instance_ids).await?;

    let mut payment_dates: HashMap<i64, Vec<NaiveDate>> = HashMap::new();
    if !series_ids.is_empty() {
        let tagged = Transaction::find()
            .filter(transaction::Column::SeriesId.is_in(series_ids.iter().copied()))
            .all(db)
            .await?;
        for txn in tagged {
            if let Some(series_id) = txn.series_id {
                payment_dates.entry(series_id).or_default().push(txn.date);
            }
        }
    }

    let mut by_series: HashMap<i64, Vec<bill_instance::Model>> = HashMap::new();
    for inst in instances {
        by_series.entry(inst.series_id).or_default().push(inst);
    }

    let mut overviews = Vec::new();
    for s in &all_series {
        let Some(series_instances) = by_series.remove(&s.id) else {
            continue;
        };
        let next = payment::earliest_unpaid(&series_instances, &paid);
        let dates = payment_dates.get(&s.id).map_or(&[][..], Vec::as_slice);
        for inst in series_instances {
            overviews.push(InstanceOverview {
                is_paid: paid.contains(&inst.id),
                has_nearby_transaction: payment::is_within_window(
                    inst.due_date,
                    dates,
                    window_days,
                ),
                series_name: s.name.clone(),
                recipient: s.recipient.clone(),
                series_archived: s.is_archived,
                next_occurrence: next,
                instance: inst,
            });
        }
    }

    overviews.sort_by(|a, b| {
        a.instance
            .due_date
            .cmp(&b.instance.due_date)
            .then_with(|| a.series_name.cmp(&b.series_name))
            .then_with(|| a.instance.id.cmp(&b.instance.id))
    });

    debug!(
        "Listed {} instances across {} series in budget {}",
        overviews.len(),
        all_series.len(),
        budget_id
    );
    Ok(overviews)
}
