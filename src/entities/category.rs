//! Category entity - Budget categories that bills and splits are booked against.
//! `(budget_id, name_key)` is unique, so names differing only in case collide.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget the category belongs to
    pub budget_id: i64,
    /// Category name as entered (e.g., "Utilities")
    pub name: String,
    /// Trimmed, lowercased `name` used for lookups and uniqueness
    pub name_key: String,
    /// When the category was created
    pub created_at: DateTime,
}

/// `Category` relationships are owned by the surrounding CRUD layer
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
