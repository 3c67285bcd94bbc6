//! Reporting endpoints

use axum::{extract::Query, extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppResult;

/// Dashboard statistics response
#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Catalog statistics
    pub books: BookStats,
    /// Membership statistics
    pub members: MemberStats,
    /// Loan statistics
    pub loans: LoanStats,
}

#[derive(Serialize, ToSchema)]
pub struct BookStats {
    /// Number of titles in the catalog
    pub titles: i64,
    /// Copies owned across all titles
    pub total_copies: i64,
    /// Copies currently on the shelf
    pub available_copies: i64,
}

#[derive(Serialize, ToSchema)]
pub struct MemberStats {
    /// Total number of members
    pub total: i64,
    /// Members with active status
    pub active: i64,
    /// Members holding at least one active loan
    pub with_active_loans: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    /// Active loans
    pub active: i64,
    /// Overdue loans
    pub overdue: i64,
    /// Books returned today
    pub returned_today: i64,
    /// Sum of fines settled on returned loans
    pub fines_assessed: Decimal,
}

/// Time interval for grouping statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Day,
    Week,
    Month,
    Year,
}

/// Borrow/return trends query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TrendsQuery {
    /// Start date (ISO 8601 format); default: 30 days ago
    pub start_date: Option<String>,
    /// End date (ISO 8601 format); default: now
    pub end_date: Option<String>,
    /// Grouping interval (day, week, month, year); default: day
    pub interval: Option<Interval>,
}

/// Borrow/return trends response
#[derive(Serialize, ToSchema)]
pub struct TrendsResponse {
    /// Total number of borrows in the period
    pub total_loans: i64,
    /// Total number of returns in the period
    pub total_returns: i64,
    /// Time series data grouped by interval
    pub time_series: Vec<TimeSeriesEntry>,
}

/// Time series entry for loan trends
#[derive(Serialize, ToSchema)]
pub struct TimeSeriesEntry {
    /// Period label (e.g., "2024-01-15" for day, "2024-W03" for week)
    pub period: String,
    /// Number of borrows in this period
    pub loans: i64,
    /// Number of returns in this period
    pub returns: i64,
}

/// Query parameters for popular books
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PopularBooksQuery {
    /// Maximum number of books to return (default: 10, max: 100)
    pub limit: Option<i64>,
}

/// A book ranked by all-time loan count
#[derive(Serialize, ToSchema)]
pub struct PopularBook {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub loan_count: i64,
}

/// Genre distribution entry
#[derive(Serialize, ToSchema)]
pub struct GenreStat {
    /// Genre label ("unknown" when unset)
    pub genre: String,
    /// Number of titles in this genre
    pub titles: i64,
    /// Number of copies owned in this genre
    pub copies: i64,
}

fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>, ()> {
    // Full RFC 3339 timestamp first, then a bare date at midnight (or
    // end of day for range ends).
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|date| {
                    let (h, m, sec) = if end_of_day { (23, 59, 59) } else { (0, 0, 0) };
                    date.and_hms_opt(h, m, sec)
                        .unwrap()
                        .and_local_timezone(Utc)
                        .unwrap()
                })
                .map_err(|_| ())
        })
        .map_err(|_| ())
}

/// Get dashboard statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardResponse)
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
) -> AppResult<Json<DashboardResponse>> {
    let stats = state.services.stats.get_dashboard().await?;
    Ok(Json(stats))
}

/// Get borrow/return trends over time
#[utoipa::path(
    get,
    path = "/stats/trends",
    tag = "stats",
    params(TrendsQuery),
    responses(
        (status = 200, description = "Borrow/return trends", body = TrendsResponse),
        (status = 400, description = "Invalid date format")
    )
)]
pub async fn get_trends(
    State(state): State<crate::AppState>,
    Query(query): Query<TrendsQuery>,
) -> AppResult<Json<TrendsResponse>> {
    let start_date = query
        .start_date
        .as_deref()
        .map(|s| parse_date(s, false))
        .transpose()
        .map_err(|_| {
            crate::error::AppError::Validation(
                "Invalid start_date format. Use ISO 8601 (RFC 3339)".to_string(),
            )
        })?;

    let end_date = query
        .end_date
        .as_deref()
        .map(|s| parse_date(s, true))
        .transpose()
        .map_err(|_| {
            crate::error::AppError::Validation(
                "Invalid end_date format. Use ISO 8601 (RFC 3339)".to_string(),
            )
        })?;

    let interval = query.interval.unwrap_or(Interval::Day);

    let stats = state
        .services
        .stats
        .get_trends(start_date, end_date, interval)
        .await?;

    Ok(Json(stats))
}

/// Get the most-borrowed books
#[utoipa::path(
    get,
    path = "/stats/popular-books",
    tag = "stats",
    params(PopularBooksQuery),
    responses(
        (status = 200, description = "Books ranked by loan count", body = Vec<PopularBook>)
    )
)]
pub async fn get_popular_books(
    State(state): State<crate::AppState>,
    Query(query): Query<PopularBooksQuery>,
) -> AppResult<Json<Vec<PopularBook>>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let books = state.services.stats.get_popular_books(limit).await?;
    Ok(Json(books))
}

/// Get genre distribution of the catalog
#[utoipa::path(
    get,
    path = "/stats/genres",
    tag = "stats",
    responses(
        (status = 200, description = "Titles and copies per genre", body = Vec<GenreStat>)
    )
)]
pub async fn get_genre_distribution(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<GenreStat>>> {
    let genres = state.services.stats.get_genre_distribution().await?;
    Ok(Json(genres))
}
