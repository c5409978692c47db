//! Series patches and schedule-change detection.
//!
//! A patch field is either [`Patch::Unset`] (leave the stored value alone) or
//! [`Patch::Set`] with the new value. Whether an update regenerates instances is
//! decided by comparing the merged schedule against the stored one, so a field
//! that is sent but unchanged never triggers regeneration, and a field changed to
//! `0.0` or `None` always does.

use crate::{
    core::{
        category::CategoryRef,
        schedule::{Recurrence, RecurrenceType},
    },
    entities::bill_series,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Keep the stored value
    Unset,
    /// Replace the stored value
    Set(T),
}

// Manual impl: `Unset` needs no `T: Default`
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Patch<T> {
    /// The new value if set, otherwise `current`.
    #[must_use]
    pub fn or_current(self, current: T) -> T {
        match self {
            Self::Set(value) => value,
            Self::Unset => current,
        }
    }

    /// Borrowing view of the patch.
    #[must_use]
    pub const fn as_ref(&self) -> Patch<&T> {
        match self {
            Self::Set(value) => Patch::Set(value),
            Self::Unset => Patch::Unset,
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Self::Set(value)
    }
}

/// One named portion of a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitInput {
    /// Label for this portion
    pub subtitle: String,
    /// Category the portion is booked against
    pub category: CategoryRef,
    /// Portion of the estimated amount
    pub amount: f64,
}

/// Where a bill's amount is booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategoryAssignment {
    /// The whole amount goes to one category
    Single(CategoryRef),
    /// The amount is divided into ordered splits summing to the estimated amount
    Split(Vec<SplitInput>),
}

/// Partial update of a bill series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPatch {
    /// New display name
    pub name: Patch<String>,
    /// New recipient
    pub recipient: Patch<String>,
    /// New paying account
    pub account_id: Patch<i64>,
    /// New category or split breakdown, replacing the stored one entirely
    pub category: Patch<CategoryAssignment>,
    /// New first due date
    pub start_date: Patch<NaiveDate>,
    /// New recurrence type
    pub recurrence_type: Patch<RecurrenceType>,
    /// New custom interval; `Set(None)` clears it
    pub custom_interval_days: Patch<Option<i32>>,
    /// New estimated amount
    pub estimated_amount: Patch<f64>,
    /// New inclusive cutoff; `Set(None)` removes it
    pub last_payment_date: Patch<Option<NaiveDate>>,
    /// Archive or unarchive
    pub is_archived: Patch<bool>,
}

/// The stored fields that determine a series' instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleFields {
    /// First due date
    pub start_date: NaiveDate,
    /// Validated recurrence rule
    pub recurrence: Recurrence,
    /// Inclusive cutoff
    pub last_payment_date: Option<NaiveDate>,
    /// Amount snapshotted onto new instances
    pub estimated_amount: f64,
}

impl ScheduleFields {
    /// Reads the schedule of a stored series.
    pub fn from_series(series: &bill_series::Model) -> Result<Self> {
        Ok(Self {
            start_date: series.start_date,
            recurrence: Recurrence::from_stored(
                &series.recurrence_type,
                series.custom_interval_days,
            )?,
            last_payment_date: series.last_payment_date,
            estimated_amount: series.estimated_amount,
        })
    }

    /// Applies the schedule part of `patch` and validates the result.
    ///
    /// When the type moves away from `Custom` and the patch does not mention the
    /// interval, the stored interval is dropped. When the type stays `Custom`, the
    /// stored interval is kept unless the patch replaces it.
    ///
    /// # Errors
    /// Returns `Error::Config` for an invalid recurrence and
    /// `Error::InvalidAmount` for a non-positive or non-finite amount.
    pub fn merged(&self, patch: &SeriesPatch) -> Result<Self> {
        let kind = patch
            .recurrence_type
            .clone()
            .or_current(self.recurrence.kind());
        let interval = match (&patch.custom_interval_days, kind) {
            (Patch::Set(days), _) => *days,
            (Patch::Unset, RecurrenceType::Custom) => self.recurrence.custom_interval_days(),
            (Patch::Unset, _) => None,
        };
        let estimated_amount = patch
            .estimated_amount
            .clone()
            .or_current(self.estimated_amount);
        validate_amount(estimated_amount)?;

        Ok(Self {
            start_date: patch.start_date.clone().or_current(self.start_date),
            recurrence: Recurrence::new(kind, interval)?,
            last_payment_date: patch
                .last_payment_date
                .clone()
                .or_current(self.last_payment_date),
            estimated_amount,
        })
    }

    /// Merges `patch` and reports whether the schedule differs from `self`.
    ///
    /// Only a changed value counts: a field sent with its stored value does not.
    pub fn changed_by(&self, patch: &SeriesPatch) -> Result<(Self, bool)> {
        let merged = self.merged(patch)?;
        let changed = merged != *self;
        Ok((merged, changed))
    }
}

/// Rejects amounts that are zero, negative, or not finite.
pub fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount })
    }
}
