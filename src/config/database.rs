//! Database configuration module for `BillBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! and the uniqueness guarantees the engine relies on are added as explicit indexes:
//! one instance per `(series_id, due_date)` and one category per budget and case-folded name.

use crate::entities::{
    BillInstance, BillSeries, BillSplit, Category, SystemState, Transaction, bill_instance,
    category,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::env::VarError;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/bill_buddy.sqlite?mode=rwc";
const DEFAULT_DATABASE_DIR: &str = "data";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default `SQLite` path.
///
/// # Errors
/// Returns `Error::EnvVar` when the variable is set but not valid unicode.
pub fn get_database_url() -> Result<String> {
    database_url_from(std::env::var("DATABASE_URL"))
}

fn database_url_from(value: std::result::Result<String, VarError>) -> Result<String> {
    match value {
        Ok(url) => Ok(url),
        Err(VarError::NotPresent) => Ok(DEFAULT_DATABASE_URL.to_string()),
        Err(err) => Err(err.into()),
    }
}

/// Directory that must exist before connecting to `database_url`.
///
/// Only the default database lives in a directory this crate owns; any other URL
/// is left to whoever configured it.
#[must_use]
pub fn local_data_dir(database_url: &str) -> Option<&'static Path> {
    (database_url == DEFAULT_DATABASE_URL).then(|| Path::new(DEFAULT_DATABASE_DIR))
}

/// Establishes a connection to `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Parents are created before children so the foreign keys generated from the
/// entity relations resolve.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    create_table(db, BillSeries).await?;
    create_table(db, BillInstance).await?;
    create_table(db, BillSplit).await?;
    create_table(db, Category).await?;
    create_table(db, Transaction).await?;
    create_table(db, SystemState).await?;

    let builder = db.get_database_backend();

    let instance_day = Index::create()
        .name("idx_bill_instances_series_due_date")
        .table(BillInstance)
        .col(bill_instance::Column::SeriesId)
        .col(bill_instance::Column::DueDate)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&instance_day)).await?;

    let category_name = Index::create()
        .name("idx_categories_budget_name_key")
        .table(Category)
        .col(category::Column::BudgetId)
        .col(category::Column::NameKey)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&category_name)).await?;

    info!("Database tables and indexes ensured");
    Ok(())
}
