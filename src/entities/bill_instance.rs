//! Bill instance entity - One materialized due date of a series.
//!
//! `amount` is a snapshot of the series' estimated amount at generation time.
//! An instance is paid when a row in `transactions` points at it through
//! `bill_instance_id`. `(series_id, due_date)` is unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill instance database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_instances")]
pub struct Model {
    /// Unique identifier for the instance
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning series
    pub series_id: i64,
    /// Calendar day this occurrence is due
    pub due_date: Date,
    /// Amount expected for this occurrence
    pub amount: f64,
    /// When the instance was generated
    pub created_at: DateTime,
}

/// Defines relationships between `BillInstance` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each instance belongs to one series
    #[sea_orm(
        belongs_to = "super::bill_series::Entity",
        from = "Column::SeriesId",
        to = "super::bill_series::Column::Id"
    )]
    Series,
}

impl Related<super::bill_series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Series.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
