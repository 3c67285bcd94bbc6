//! Loans repository: the single writer of loan-status transitions and
//! of the availability counters they move.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        loan::{
            self, CreateLoan, LoanDetails, LoanRecord, LoanStatus, OverdueLoan, ReturnLoan,
        },
        member::{Member, MembershipStatus},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<LoanRecord> {
        sqlx::query_as::<_, LoanRecord>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Create a new loan (borrow a book).
    ///
    /// Runs as one transaction: the member row is locked before the cap
    /// check so concurrent borrows by the same member serialize, and the
    /// availability decrement is conditional so two borrows of the last
    /// copy cannot both commit. Any precondition failure rolls the whole
    /// thing back.
    pub async fn create(&self, req: &CreateLoan) -> AppResult<LoanRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 FOR UPDATE")
            .bind(req.member_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Member with id {} not found", req.member_id))
            })?;

        if member.membership_status != MembershipStatus::Active {
            return Err(AppError::Conflict(
                ErrorCode::MemberNotActive,
                format!("Membership is {}", member.membership_status),
            ));
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND status = 'active'",
        )
        .bind(req.member_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= member.max_books as i64 {
            return Err(AppError::Conflict(
                ErrorCode::MaxBorrowsReached,
                format!("Borrowing cap reached ({}/{})", active, member.max_books),
            ));
        }

        let decremented = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1, updated_at = $2
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(req.book_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if decremented == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(req.book_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists {
                return Err(AppError::Conflict(
                    ErrorCode::BookUnavailable,
                    "No copies available".to_string(),
                ));
            }
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                req.book_id
            )));
        }

        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            INSERT INTO loans (
                book_id, member_id, borrow_date, due_date, status, fine_amount,
                notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, 'active', 0, $5, $3, $3)
            RETURNING *
            "#,
        )
        .bind(req.book_id)
        .bind(req.member_id)
        .bind(now)
        .bind(req.due_date)
        .bind(&req.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Return a loan.
    ///
    /// The loan row is locked so a second concurrent return observes the
    /// terminal status and fails; the availability increment happens in
    /// the same transaction, exactly once per loan.
    pub async fn return_loan(&self, loan_id: i32, req: &ReturnLoan) -> AppResult<LoanRecord> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, LoanRecord>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if current.status != LoanStatus::Active {
            return Err(AppError::Conflict(
                ErrorCode::AlreadyReturned,
                "Loan already returned".to_string(),
            ));
        }

        let returned_at = req.return_date.unwrap_or_else(Utc::now);
        // An explicitly supplied fine always wins, including 0 for an
        // overdue return (staff discretion).
        let fine = match req.fine_amount {
            Some(explicit) => explicit.round_dp(2),
            None => loan::fine_for(current.due_date, returned_at),
        };

        let notes = match (&current.notes, &req.notes) {
            (Some(old), Some(new)) => Some(format!("{}\n{}", old, new)),
            (None, Some(new)) => Some(new.clone()),
            (old, None) => old.clone(),
        };

        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            UPDATE loans
            SET status = 'returned', return_date = $2, fine_amount = $3,
                notes = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(returned_at)
        .bind(fine)
        .bind(&notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        // Clamped to total_copies: a manual shrink of the total while the
        // loan was out must not push the shelf count past the owned count.
        sqlx::query(
            r#"
            UPDATE books
            SET available_copies = LEAST(available_copies + 1, total_copies), updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(current.book_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Renew a loan: extend the due date, nothing else. Fines accrued
    /// before the renewal are neither applied nor cleared; they only
    /// materialize at return time.
    pub async fn renew_loan(
        &self,
        loan_id: i32,
        new_due_date: chrono::DateTime<Utc>,
    ) -> AppResult<LoanRecord> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, LoanRecord>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if current.status != LoanStatus::Active {
            return Err(AppError::Conflict(
                ErrorCode::AlreadyReturned,
                "Cannot renew a returned loan".to_string(),
            ));
        }

        let record = sqlx::query_as::<_, LoanRecord>(
            "UPDATE loans SET due_date = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(loan_id)
        .bind(new_due_date)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Get loans for a member, ordered by due date. Active only by
    /// default; `include_returned` adds the full history, where the book
    /// may have been deleted since.
    pub async fn get_member_loans(
        &self,
        member_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.book_id, l.member_id, l.borrow_date, l.due_date,
                   l.return_date, l.status, l.fine_amount, l.notes,
                   b.title AS book_title, b.author AS book_author
            FROM loans l
            LEFT JOIN books b ON l.book_id = b.id
            WHERE l.member_id = $1 AND ($2 OR l.status = 'active')
            ORDER BY l.due_date
            "#,
        )
        .bind(member_id)
        .bind(include_returned)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        let mut result = Vec::new();
        for row in rows {
            let status: LoanStatus = row.get("status");
            let due_date: chrono::DateTime<Utc> = row.get("due_date");
            result.push(LoanDetails {
                id: row.get("id"),
                book_id: row.get("book_id"),
                book_title: row
                    .get::<Option<String>, _>("book_title")
                    .unwrap_or_else(|| "(deleted)".to_string()),
                book_author: row
                    .get::<Option<String>, _>("book_author")
                    .unwrap_or_else(|| "(deleted)".to_string()),
                member_id: row.get("member_id"),
                borrow_date: row.get("borrow_date"),
                due_date,
                return_date: row.get("return_date"),
                status,
                fine_amount: row.get("fine_amount"),
                is_overdue: status == LoanStatus::Active && due_date < now,
                notes: row.get("notes"),
            });
        }

        Ok(result)
    }

    /// All active loans past their due date, annotated with the fine
    /// they would incur if returned now. Read-only derived view.
    pub async fn list_overdue(&self) -> AppResult<Vec<OverdueLoan>> {
        let now = Utc::now();

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.book_id, l.member_id, l.borrow_date, l.due_date,
                   b.title AS book_title, b.author AS book_author,
                   m.name AS member_name, m.email AS member_email
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN members m ON l.member_id = m.id
            WHERE l.status = 'active' AND l.due_date < $1
            ORDER BY l.due_date
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let result = rows
            .into_iter()
            .map(|row| {
                let due_date: chrono::DateTime<Utc> = row.get("due_date");
                OverdueLoan {
                    id: row.get("id"),
                    book_id: row.get("book_id"),
                    book_title: row.get("book_title"),
                    book_author: row.get("book_author"),
                    member_id: row.get("member_id"),
                    member_name: row.get("member_name"),
                    member_email: row.get("member_email"),
                    borrow_date: row.get("borrow_date"),
                    due_date,
                    days_overdue: loan::days_overdue(due_date, now),
                    calculated_fine: loan::fine_for(due_date, now),
                }
            })
            .collect();

        Ok(result)
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
