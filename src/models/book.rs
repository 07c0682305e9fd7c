//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::not_blank;
use crate::error::{AppError, AppResult};

/// Book from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    /// Total number of copies owned by the library
    pub quantity: i32,
    /// Copies currently on the shelf
    pub available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently lent out
    pub fn borrowed(&self) -> i32 {
        self.quantity - self.available
    }
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Search in title and author
    pub search: Option<String>,
    pub category_id: Option<i32>,
    /// Only return books with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1 to 255 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[validate(length(max = 255, message = "Author must be at most 255 characters"))]
    pub author: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1 to 255 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "Author must be at most 255 characters"))]
    pub author: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
}

/// Shelf count after changing the number of owned copies.
///
/// Lent-out copies stay lent out, so the shelf absorbs the whole delta.
pub fn rebalance_available(quantity: i32, available: i32, new_quantity: i32) -> AppResult<i32> {
    let borrowed = quantity - available;
    if new_quantity < borrowed {
        return Err(AppError::BusinessRule(format!(
            "Quantity cannot be lower than the {} copies currently borrowed",
            borrowed
        )));
    }
    Ok(new_quantity - borrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebalance_grows_shelf() {
        assert_eq!(rebalance_available(5, 3, 8).unwrap(), 6);
    }

    #[test]
    fn test_rebalance_shrinks_shelf() {
        assert_eq!(rebalance_available(5, 3, 2).unwrap(), 0);
        assert_eq!(rebalance_available(5, 5, 0).unwrap(), 0);
    }

    #[test]
    fn test_blank_title_is_invalid() {
        let book = CreateBook {
            title: "   ".to_string(),
            author: None,
            description: None,
            category_id: None,
            quantity: 1,
        };
        assert!(book.validate().is_err());

        let update = UpdateBook {
            title: Some(" \t ".to_string()),
            author: None,
            description: None,
            category_id: None,
            quantity: None,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_rebalance_below_borrowed() {
        assert!(matches!(
            rebalance_available(5, 3, 1),
            Err(AppError::BusinessRule(_))
        ));
    }
}
