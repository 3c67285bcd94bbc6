//! Loan ledger service: borrow, return, renew, and the overdue view.
//!
//! The only component allowed to move a loan through its state machine
//! or to touch availability counters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, LoanDetails, LoanRecord, OverdueLoan, ReturnLoan},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a loan by ID
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanRecord> {
        self.repository.loans.get_by_id(loan_id).await
    }

    /// Borrow a book for a member
    pub async fn borrow(&self, req: CreateLoan) -> AppResult<LoanRecord> {
        if req.due_date < Utc::now() {
            return Err(AppError::Validation(
                "Due date cannot be in the past".to_string(),
            ));
        }

        let record = self.repository.loans.create(&req).await?;

        tracing::info!(
            loan_id = record.id,
            book_id = record.book_id,
            member_id = record.member_id,
            "Book borrowed"
        );

        Ok(record)
    }

    /// Return a borrowed book, settling the fine
    pub async fn return_loan(&self, loan_id: i32, req: ReturnLoan) -> AppResult<LoanRecord> {
        if let Some(fine) = req.fine_amount {
            if fine < Decimal::ZERO {
                return Err(AppError::Validation(
                    "Fine amount cannot be negative".to_string(),
                ));
            }
        }

        let record = self.repository.loans.return_loan(loan_id, &req).await?;

        tracing::info!(
            loan_id = record.id,
            book_id = record.book_id,
            fine = %record.fine_amount,
            "Book returned"
        );

        Ok(record)
    }

    /// Renew a loan: due date moves, nothing else does
    pub async fn renew_loan(
        &self,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<LoanRecord> {
        if new_due_date < Utc::now() {
            return Err(AppError::Validation(
                "New due date cannot be in the past".to_string(),
            ));
        }

        let record = self.repository.loans.renew_loan(loan_id, new_due_date).await?;

        tracing::info!(loan_id = record.id, due_date = %record.due_date, "Loan renewed");

        Ok(record)
    }

    /// Get loans for a member
    pub async fn get_member_loans(
        &self,
        member_id: i32,
        include_returned: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        // Verify member exists
        self.repository.members.get_by_id(member_id).await?;
        self.repository
            .loans
            .get_member_loans(member_id, include_returned)
            .await
    }

    /// List overdue loans with their accrued fines
    pub async fn list_overdue(&self) -> AppResult<Vec<OverdueLoan>> {
        self.repository.loans.list_overdue().await
    }
}
