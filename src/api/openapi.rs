//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, members, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblios API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Loans
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
        loans::renew_loan,
        loans::list_overdue,
        loans::get_member_loans,
        // Stats
        stats::get_stats,
        stats::get_trends,
        stats::get_popular_books,
        stats::get_genre_distribution,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Members
            crate::models::member::Member,
            crate::models::member::MembershipStatus,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            // Loans
            loans::CreateLoanRequest,
            loans::LoanResponse,
            loans::ReturnLoanRequest,
            loans::ReturnResponse,
            loans::RenewLoanRequest,
            crate::models::loan::LoanRecord,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::OverdueLoan,
            // Stats
            stats::DashboardResponse,
            stats::BookStats,
            stats::MemberStats,
            stats::LoanStats,
            stats::Interval,
            stats::TrendsResponse,
            stats::TimeSeriesEntry,
            stats::PopularBook,
            stats::GenreStat,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member management"),
        (name = "loans", description = "Loan ledger: borrow, return, renew"),
        (name = "stats", description = "Reporting")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
