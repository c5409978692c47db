//! Transaction entity - Settled transactions recorded against an account.
//!
//! Only the columns the bill engine reads are modelled here. `bill_instance_id`
//! links a payment to the occurrence it settles; `series_id` links it to the
//! series for the nearby-payment check even when no exact instance is linked.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget the transaction belongs to
    pub budget_id: i64,
    /// Account the money moved from
    pub account_id: i64,
    /// Bill series this payment belongs to, if any
    pub series_id: Option<i64>,
    /// Bill instance this payment settles, if any
    pub bill_instance_id: Option<i64>,
    /// Amount paid in dollars
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Calendar day the payment was made
    pub date: Date,
    /// When the transaction was recorded
    pub created_at: DateTimeUtc,
}

/// Transaction links are plain columns; the engine resolves them itself
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
