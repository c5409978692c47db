//! Bill series entity - The recurring bill template.
//!
//! A series owns a schedule (start date, recurrence, optional last payment date),
//! an estimated amount, and either a single category or an ordered list of splits.
//! Its materialized due dates live in `bill_instances`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill series database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_series")]
pub struct Model {
    /// Unique identifier for the series
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget that owns this series
    pub budget_id: i64,
    /// Display name (e.g., "Rent", "Electricity")
    pub name: String,
    /// Who gets paid
    pub recipient: String,
    /// Account the bill is paid from
    pub account_id: i64,
    /// Single category, `None` when the bill is split across categories
    pub category_id: Option<i64>,
    /// First due date
    pub start_date: Date,
    /// One of `"none"`, `"weekly"`, `"monthly"`, `"quarterly"`, `"yearly"`, `"custom"`
    pub recurrence_type: String,
    /// Interval in days, present only for `"custom"`
    pub custom_interval_days: Option<i32>,
    /// Expected amount of each occurrence in dollars
    pub estimated_amount: f64,
    /// Inclusive cutoff; no occurrence is generated after it
    pub last_payment_date: Option<Date>,
    /// Archived series are hidden from listings by default
    pub is_archived: bool,
    /// Bumped on every update, used to detect concurrent writers
    pub revision: i64,
    /// When the series was created
    pub created_at: DateTime,
    /// When the series was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `BillSeries` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One series has many instances
    #[sea_orm(has_many = "super::bill_instance::Entity")]
    Instances,
    /// One series has many splits
    #[sea_orm(has_many = "super::bill_split::Entity")]
    Splits,
}

impl Related<super::bill_instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instances.def()
    }
}

impl Related<super::bill_split::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
