//! Category resolution - turns category references on bills and splits into ids.
//!
//! A reference is either an existing category id or a name. Names are resolved
//! case-insensitively within the budget and created when missing, so resolving the
//! same name twice always yields the same category.

use crate::{
    entities::{Category, category},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How a bill or split points at its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryRef {
    /// An existing category id
    Id(i64),
    /// A category name, created in the budget if it does not exist yet
    Name(String),
}

/// Lookup key stored alongside a category name.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Finds a category in the budget by name, ignoring case and surrounding whitespace.
pub async fn find_category_by_name<C>(
    db: &C,
    budget_id: i64,
    name: &str,
) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::BudgetId.eq(budget_id))
        .filter(category::Column::NameKey.eq(name_key(name)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the budget's category with this name, creating it if needed.
///
/// # Errors
/// Returns `Error::Config` for an empty name, or a database error.
pub async fn resolve_or_create_category<C>(
    db: &C,
    budget_id: i64,
    name: &str,
) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Config {
            message: "Category name cannot be empty".to_string(),
        });
    }

    if let Some(existing) = find_category_by_name(db, budget_id, name).await? {
        debug!("Resolved category '{}' to id {}", name, existing.id);
        return Ok(existing);
    }

    let new_category = category::ActiveModel {
        budget_id: Set(budget_id),
        name: Set(name.to_string()),
        name_key: Set(name_key(name)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    match new_category.insert(db).await {
        Ok(created) => {
            info!(
                "Created category '{}' (id {}) in budget {}",
                created.name, created.id, budget_id
            );
            Ok(created)
        }
        // Another writer created it between our read and insert
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_category_by_name(db, budget_id, name)
                .await?
                .ok_or(Error::Database(err))
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolves a reference to a category id in the budget.
///
/// # Errors
/// Returns `Error::CategoryNotFound` when an id does not exist in the budget.
pub async fn resolve_category_ref<C>(db: &C, budget_id: i64, reference: &CategoryRef) -> Result<i64>
where
    C: ConnectionTrait,
{
    match reference {
        CategoryRef::Id(id) => Category::find_by_id(*id)
            .filter(category::Column::BudgetId.eq(budget_id))
            .one(db)
            .await?
            .map(|c| c.id)
            .ok_or(Error::CategoryNotFound { id: *id }),
        CategoryRef::Name(name) => Ok(resolve_or_create_category(db, budget_id, name).await?.id),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_empty_name_rejected_without_query() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = resolve_or_create_category(&db, 1, "   ").await;
        assert!(matches!(result, Err(Error::Config { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = resolve_or_create_category(&db, TEST_BUDGET_ID, "Utilities").await?;
        let second = resolve_or_create_category(&db, TEST_BUDGET_ID, "Utilities").await?;
        let third = resolve_or_create_category(&db, TEST_BUDGET_ID, "  utilities ").await?;

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(Category::find().count(&db).await?, 1);

        Ok(())
    }

    #[test]
    fn test_name_key_folds_case_and_whitespace() {
        assert_eq!(name_key("  Utilities "), "utilities");
        assert_eq!(name_key("UTILITIES"), name_key("utilities"));
    }

    #[tokio::test]
    async fn test_case_variants_cannot_both_be_stored() -> Result<()> {
        let db = setup_test_db().await?;
        let first = resolve_or_create_category(&db, TEST_BUDGET_ID, "Utilities").await?;
        assert_eq!(first.name, "Utilities");
        assert_eq!(first.name_key, "utilities");

        // A writer that skipped the lookup hits the unique index
        let racing = category::ActiveModel {
            budget_id: Set(TEST_BUDGET_ID),
            name: Set("utilities".to_string()),
            name_key: Set(name_key("utilities")),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        let err = racing.insert(&db).await.unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));

        let found = find_category_by_name(&db, TEST_BUDGET_ID, "UTILITIES").await?;
        assert_eq!(found, Some(first));
        assert_eq!(Category::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_categories_are_scoped_by_budget() -> Result<()> {
        let db = setup_test_db().await?;

        let ours = resolve_or_create_category(&db, 1, "Rent").await?;
        let theirs = resolve_or_create_category(&db, 2, "Rent").await?;

        assert_ne!(ours.id, theirs.id);
        assert!(matches!(
            resolve_category_ref(&db, 2, &CategoryRef::Id(ours.id)).await,
            Err(Error::CategoryNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_category_ref() -> Result<()> {
        let db = setup_test_db().await?;

        let by_name =
            resolve_category_ref(&db, TEST_BUDGET_ID, &CategoryRef::Name("Insurance".into()))
                .await?;
        let by_id = resolve_category_ref(&db, TEST_BUDGET_ID, &CategoryRef::Id(by_name)).await?;
        assert_eq!(by_name, by_id);

        assert!(matches!(
            resolve_category_ref(&db, TEST_BUDGET_ID, &CategoryRef::Id(999)).await,
            Err(Error::CategoryNotFound { id: 999 })
        ));

        Ok(())
    }
}
