//! Bill split entity - A named portion of a series' amount assigned to a category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill split database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_splits")]
pub struct Model {
    /// Unique identifier for the split
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning series
    pub series_id: i64,
    /// Order within the series, starting at 0
    pub position: i32,
    /// Label for this portion (e.g., "Water", "Sewer")
    pub subtitle: String,
    /// Category this portion is booked against
    pub category_id: i64,
    /// Portion of the estimated amount in dollars
    pub amount: f64,
}

/// Defines relationships between `BillSplit` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each split belongs to one series
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
