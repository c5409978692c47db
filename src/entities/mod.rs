//! Entity module - SeaORM entity definitions for the bill engine tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bill_instance;
pub mod bill_series;
pub mod bill_split;
pub mod category;
pub mod system_state;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use bill_instance::{
    Column as BillInstanceColumn, Entity as BillInstance, Model as BillInstanceModel,
};
pub use bill_series::{Column as BillSeriesColumn, Entity as BillSeries, Model as BillSeriesModel};
pub use bill_split::{Column as BillSplitColumn, Entity as BillSplit, Model as BillSplitModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
