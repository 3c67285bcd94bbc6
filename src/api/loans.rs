//! Loan ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, LoanDetails, LoanRecord, OverdueLoan, ReturnLoan},
};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book ID
    pub book_id: i32,
    /// Member ID
    pub member_id: i32,
    /// Due date (ISO 8601 format), present or future
    pub due_date: DateTime<Utc>,
    /// Optional notes attached to the loan
    pub notes: Option<String>,
}

/// Loan response with calculated dates
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Return request. All fields optional: the return date defaults to
/// now, and the fine to the computed one.
#[derive(Deserialize, Default, ToSchema)]
pub struct ReturnLoanRequest {
    /// Return date (ISO 8601 format), defaults to now
    pub return_date: Option<DateTime<Utc>>,
    /// Explicit fine override (staff discretion, 0 allowed)
    pub fine_amount: Option<Decimal>,
    /// Notes appended to the loan
    pub notes: Option<String>,
}

/// Return response with the settled fine
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Final fine amount settled on the loan
    pub fine_amount: Decimal,
    /// The returned loan record
    pub loan: LoanRecord,
}

/// Renew loan request
#[derive(Deserialize, ToSchema)]
pub struct RenewLoanRequest {
    /// New due date (ISO 8601 format), present or future
    pub due_date: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct MemberLoansParams {
    /// Include returned loans (full history)
    pub all: Option<bool>,
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan record", body = LoanRecord),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanRecord>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Book unavailable, member not active, or borrowing cap reached")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = CreateLoan {
        book_id: request.book_id,
        member_id: request.member_id,
        due_date: request.due_date,
        notes: request.notes,
    };

    let record = state.services.loans.borrow(loan).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: record.id,
            due_date: record.due_date,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoanRequest>>,
) -> AppResult<Json<ReturnResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let loan = state
        .services
        .loans
        .return_loan(
            loan_id,
            ReturnLoan {
                return_date: request.return_date,
                fine_amount: request.fine_amount,
                notes: request.notes,
            },
        )
        .await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        fine_amount: loan.fine_amount,
        loan,
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = RenewLoanRequest,
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 400, description = "Invalid due date"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<RenewLoanRequest>,
) -> AppResult<Json<LoanResponse>> {
    let record = state
        .services
        .loans
        .renew_loan(loan_id, request.due_date)
        .await?;

    Ok(Json(LoanResponse {
        id: record.id,
        due_date: record.due_date,
        message: "Loan renewed".to_string(),
    }))
}

/// List overdue loans
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans past their due date", body = Vec<OverdueLoan>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let loans = state.services.loans.list_overdue().await?;
    Ok(Json(loans))
}

/// Get loans for a specific member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Member ID"),
        ("all" = Option<bool>, Query, description = "Include returned loans")
    ),
    responses(
        (status = 200, description = "Member's loans", body = Vec<LoanDetails>),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_loans(
    State(state): State<crate::AppState>,
    Path(member_id): Path<i32>,
    Query(params): Query<MemberLoansParams>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .loans
        .get_member_loans(member_id, params.all.unwrap_or(false))
        .await?;
    Ok(Json(loans))
}
