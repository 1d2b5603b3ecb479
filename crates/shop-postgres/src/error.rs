//! Mapping from `sqlx::Error` into `ShopError`.

use shop_core::{ShopError, ShopResult};
use std::str::FromStr;
use tracing::error;

/// Unique-index violation, optionally restricted to one named index
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            constraint.map_or(true, |name| db.constraint() == Some(name))
        }
        _ => false,
    }
}

pub(crate) fn storage(err: sqlx::Error) -> ShopError {
    if is_unique_violation(&err, None) {
        return ShopError::Conflict("Record already exists".to_string());
    }
    error!(error = %err, "Database error");
    ShopError::Storage(err.to_string())
}

pub(crate) trait DbResultExt<T> {
    /// Every failure becomes `Storage` (or `Conflict` for a unique violation)
    fn db(self) -> ShopResult<T>;

    /// A unique violation on `constraint` becomes `Conflict(message)`
    fn conflict_on(self, constraint: &str, message: &str) -> ShopResult<T>;
}

impl<T> DbResultExt<T> for Result<T, sqlx::Error> {
    fn db(self) -> ShopResult<T> {
        self.map_err(storage)
    }

    fn conflict_on(self, constraint: &str, message: &str) -> ShopResult<T> {
        self.map_err(|err| {
            if is_unique_violation(&err, Some(constraint)) {
                ShopError::Conflict(message.to_string())
            } else {
                storage(err)
            }
        })
    }
}

/// Parse a text column holding an enum value
pub(crate) fn parse_column<T>(raw: &str, column: &str) -> ShopResult<T>
where
    T: FromStr<Err = ShopError>,
{
    raw.parse()
        .map_err(|_| ShopError::Storage(format!("unexpected value {:?} in column {}", raw, column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::OrderStatus;

    #[test]
    fn test_parse_column() {
        let status: OrderStatus = parse_column("shipped", "orders.status").unwrap();
        assert_eq!(status, OrderStatus::Shipped);

        let err = parse_column::<OrderStatus>("lost", "orders.status").unwrap_err();
        assert!(matches!(err, ShopError::Storage(_)));
    }

    #[test]
    fn test_row_not_found_is_storage() {
        assert!(matches!(storage(sqlx::Error::RowNotFound), ShopError::Storage(_)));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound, None));
    }
}
