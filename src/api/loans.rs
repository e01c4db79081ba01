//! Borrow record endpoints

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::LoanDetails,
    AppState,
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// ID of the book to borrow, as a number or a numeric string
    #[serde(default, deserialize_with = "book_id")]
    pub book: Option<i32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BookRef {
    Id(i32),
    Text(String),
}

fn book_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BookRef>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BookRef::Id(id)) => Ok(Some(id)),
        Some(BookRef::Text(text)) => text.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Loan ID taken from the path; anything that is not an integer is an unknown loan
pub struct LoanId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for LoanId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound("Loan not found".to_string()))?;
        Ok(LoanId(id))
    }
}

/// List loans (all loans for staff, own loans otherwise)
#[utoipa::path(
    get,
    path = "/borrow/",
    tag = "borrow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visible loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans(&claims).await?;
    Ok(Json(loans))
}

/// Get one loan
#[utoipa::path(
    get,
    path = "/borrow/{id}/",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    LoanId(loan_id): LoanId,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(&claims, loan_id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow/",
    tag = "borrow",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "No copies available or already borrowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    request: Option<Json<CreateLoanRequest>>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    // A missing, non-JSON or unreadable body carries no book
    let book_id = request.and_then(|Json(request)| request.book);
    let loan = state.services.loans.borrow_book(&claims, book_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrow/{id}/return_book/",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanDetails),
        (status = 400, description = "Book already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    LoanId(loan_id): LoanId,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.return_book(&claims, loan_id).await?;
    Ok(Json(loan))
}
