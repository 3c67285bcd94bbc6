//! Loan (borrowing) model, status machine and fine arithmetic

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Fine charged per whole overdue day, in currency units
pub static DAILY_FINE: Lazy<Decimal> = Lazy::new(|| Decimal::new(50, 2));

/// Loan status (string identifier). ACTIVE -> RETURNED is the only
/// transition; RETURNED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as TEXT)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Loan record from database. Append-only: rows are never deleted, and
/// book_id/member_id are weak references that survive catalog deletions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanRecord {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    /// Settled fine; non-zero only once the loan is returned
    pub fine_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create loan (borrow) parameters
#[derive(Debug, Clone)]
pub struct CreateLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Return loan parameters
#[derive(Debug, Clone, Default)]
pub struct ReturnLoan {
    /// Defaults to now
    pub return_date: Option<DateTime<Utc>>,
    /// Staff override; wins over the computed fine, 0 allowed
    pub fine_amount: Option<Decimal>,
    pub notes: Option<String>,
}

/// Loan with book summary for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub fine_amount: Decimal,
    pub is_overdue: bool,
    pub notes: Option<String>,
}

/// Active overdue loan annotated with the fine it would incur if
/// returned now. Derived view only; nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueLoan {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub member_id: i32,
    pub member_name: String,
    pub member_email: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub days_overdue: i64,
    pub calculated_fine: Decimal,
}

/// Whole days elapsed past the due date at `at`, floored, never negative.
pub fn days_overdue(due_date: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - due_date).num_days().max(0)
}

/// Fine owed at `at` for a loan due at `due_date`: whole overdue days
/// times the daily rate. The single fine computation in the codebase;
/// Return and every overdue read path go through it.
pub fn fine_for(due_date: DateTime<Utc>, at: DateTime<Utc>) -> Decimal {
    Decimal::from(days_overdue(due_date, at)) * *DAILY_FINE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn three_whole_days_late_costs_one_fifty() {
        let due = utc(2024, 1, 1, 12);
        let returned = utc(2024, 1, 4, 12);
        assert_eq!(days_overdue(due, returned), 3);
        assert_eq!(fine_for(due, returned), Decimal::new(150, 2));
    }

    #[test]
    fn on_time_return_has_no_fine() {
        let due = utc(2024, 1, 10, 12);
        assert_eq!(fine_for(due, utc(2024, 1, 10, 12)), Decimal::ZERO);
        assert_eq!(fine_for(due, utc(2024, 1, 3, 9)), Decimal::ZERO);
        assert_eq!(days_overdue(due, utc(2024, 1, 3, 9)), 0);
    }

    #[test]
    fn partial_days_are_floored() {
        let due = utc(2024, 1, 1, 12);
        // 2 days and 11 hours late counts as 2 whole days
        let returned = utc(2024, 1, 3, 23);
        assert_eq!(days_overdue(due, returned), 2);
        assert_eq!(fine_for(due, returned), Decimal::new(100, 2));
    }

    #[test]
    fn less_than_one_day_late_is_free() {
        let due = utc(2024, 1, 1, 12);
        let returned = utc(2024, 1, 2, 11);
        assert_eq!(days_overdue(due, returned), 0);
        assert_eq!(fine_for(due, returned), Decimal::ZERO);
    }

    #[test]
    fn loan_status_round_trips_through_slug() {
        for status in [LoanStatus::Active, LoanStatus::Returned] {
            assert_eq!(status.as_str().parse::<LoanStatus>(), Ok(status));
        }
        assert!("lost".parse::<LoanStatus>().is_err());
    }
}
