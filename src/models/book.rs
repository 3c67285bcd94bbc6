//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// ISBN, unique when present
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub publication_year: Option<i16>,
    pub description: Option<String>,
    /// Copies owned by the library
    pub total_copies: i16,
    /// Copies currently on the shelf (total minus active loans)
    pub available_copies: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub publication_year: Option<i16>,
    pub description: Option<String>,
    /// Number of copies owned (defaults to 1)
    #[validate(range(min = 1, message = "A book must have at least one copy"))]
    pub total_copies: Option<i16>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub publication_year: Option<i16>,
    pub description: Option<String>,
    /// New total; cannot shrink below the number of copies on loan
    #[validate(range(min = 1, message = "A book must have at least one copy"))]
    pub total_copies: Option<i16>,
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Free text search over title, author and ISBN
    pub search: Option<String>,
    pub genre: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
