//! Reporting service: read-only aggregations for dashboards.
//!
//! Consumes the same three tables as the loan ledger but never writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use crate::{
    api::stats::{
        BookStats, DashboardResponse, GenreStat, Interval, LoanStats, MemberStats, PopularBook,
        TimeSeriesEntry, TrendsResponse,
    },
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get dashboard statistics
    pub async fn get_dashboard(&self) -> AppResult<DashboardResponse> {
        let pool = &self.repository.pool;

        let titles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await?;

        let (total_copies, available_copies): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_copies), 0)::bigint,
                   COALESCE(SUM(available_copies), 0)::bigint
            FROM books
            "#,
        )
        .fetch_one(pool)
        .await?;

        let members_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await?;

        let members_active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE membership_status = 'active'")
                .fetch_one(pool)
                .await?;

        let members_with_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT member_id) FROM loans WHERE status = 'active'",
        )
        .fetch_one(pool)
        .await?;

        let active_loans = self.repository.loans.count_active().await?;
        let overdue_loans = self.repository.loans.count_overdue().await?;

        let returned_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'returned' AND return_date >= DATE_TRUNC('day', NOW())",
        )
        .fetch_one(pool)
        .await?;

        let fines_assessed: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(fine_amount), 0) FROM loans WHERE status = 'returned'",
        )
        .fetch_one(pool)
        .await?;

        Ok(DashboardResponse {
            books: BookStats {
                titles,
                total_copies,
                available_copies,
            },
            members: MemberStats {
                total: members_total,
                active: members_active,
                with_active_loans: members_with_loans,
            },
            loans: LoanStats {
                active: active_loans,
                overdue: overdue_loans,
                returned_today,
                fines_assessed,
            },
        })
    }

    /// Borrow/return time series grouped by interval
    pub async fn get_trends(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        interval: Interval,
    ) -> AppResult<TrendsResponse> {
        let pool = &self.repository.pool;

        // Default date range: last 30 days
        let start = start_date.unwrap_or_else(|| Utc::now() - chrono::Duration::days(30));
        let end = end_date.unwrap_or_else(Utc::now);

        let trunc = match interval {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        };

        let date_format = match interval {
            Interval::Day => "YYYY-MM-DD",
            Interval::Week => "IYYY-\"W\"IW",
            Interval::Month => "YYYY-MM",
            Interval::Year => "YYYY",
        };

        let borrows_query = format!(
            r#"
            SELECT TO_CHAR(DATE_TRUNC('{trunc}', borrow_date), '{fmt}') as period,
                   COUNT(*) as count
            FROM loans
            WHERE borrow_date >= $1 AND borrow_date <= $2
            GROUP BY 1
            ORDER BY 1
            "#,
            trunc = trunc,
            fmt = date_format
        );

        let returns_query = format!(
            r#"
            SELECT TO_CHAR(DATE_TRUNC('{trunc}', return_date), '{fmt}') as period,
                   COUNT(*) as count
            FROM loans
            WHERE return_date IS NOT NULL AND return_date >= $1 AND return_date <= $2
            GROUP BY 1
            ORDER BY 1
            "#,
            trunc = trunc,
            fmt = date_format
        );

        let mut period_map: HashMap<String, (i64, i64)> = HashMap::new();

        for row in sqlx::query(&borrows_query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?
        {
            let period: String = row.get("period");
            let count: i64 = row.get("count");
            period_map.entry(period).or_insert((0, 0)).0 += count;
        }

        for row in sqlx::query(&returns_query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?
        {
            let period: String = row.get("period");
            let count: i64 = row.get("count");
            period_map.entry(period).or_insert((0, 0)).1 += count;
        }

        let mut time_series: Vec<TimeSeriesEntry> = period_map
            .into_iter()
            .map(|(period, (loans, returns))| TimeSeriesEntry {
                period,
                loans,
                returns,
            })
            .collect();

        time_series.sort_by(|a, b| a.period.cmp(&b.period));

        let total_loans: i64 = time_series.iter().map(|e| e.loans).sum();
        let total_returns: i64 = time_series.iter().map(|e| e.returns).sum();

        Ok(TrendsResponse {
            total_loans,
            total_returns,
            time_series,
        })
    }

    /// Most-borrowed books, all time
    pub async fn get_popular_books(&self, limit: i64) -> AppResult<Vec<PopularBook>> {
        let rows = sqlx::query(
            r#"
            SELECT l.book_id,
                   COALESCE(b.title, '(deleted)') as title,
                   COALESCE(b.author, '(deleted)') as author,
                   COUNT(*) as loan_count
            FROM loans l
            LEFT JOIN books b ON l.book_id = b.id
            GROUP BY l.book_id, b.title, b.author
            ORDER BY loan_count DESC, l.book_id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PopularBook {
                book_id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                loan_count: row.get("loan_count"),
            })
            .collect())
    }

    /// Distribution of titles and copies across genres
    pub async fn get_genre_distribution(&self) -> AppResult<Vec<GenreStat>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(genre, 'unknown') as genre,
                   COUNT(*) as titles,
                   COALESCE(SUM(total_copies), 0)::bigint as copies
            FROM books
            GROUP BY 1
            ORDER BY titles DESC, genre
            "#,
        )
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GenreStat {
                genre: row.get("genre"),
                titles: row.get("titles"),
                copies: row.get("copies"),
            })
            .collect())
    }
}
