//! Loan management service
//!
//! Borrowing checks the book's available-copies counter and the caller's
//! open loans, then records the loan and decrements the counter. Returning
//! closes the loan and increments the counter back. The check and the
//! decrement are separate statements; two borrows racing for the last copy
//! can both succeed.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{LoanDetails, NewLoan},
        user::UserClaims,
    },
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

    /// List loans visible to the caller
    pub async fn list_loans(&self, caller: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        if caller.is_admin() {
            self.repository.loans.list_all().await
        } else {
            self.repository.loans.list_for_user(caller.user_id).await
        }
    }

    /// Get a single loan visible to the caller
    pub async fn get_loan(&self, caller: &UserClaims, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository
            .loans
            .get_details(loan_id)
            .await?
            .filter(|loan| caller.can_access(loan.user))
            .ok_or_else(loan_not_found)
    }

    /// Borrow a book for the caller
    pub async fn borrow_book(&self, caller: &UserClaims, book_id: Option<i32>) -> AppResult<LoanDetails> {
        let book = match book_id {
            Some(id) => self.repository.books.get_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if !book.is_available() {
            return Err(AppError::Validation("No copies available".to_string()));
        }

        if self.repository.loans.has_open_loan(caller.user_id, book.id).await? {
            return Err(AppError::Validation(
                "You already have this book borrowed".to_string(),
            ));
        }

        let loan = self
            .repository
            .loans
            .create(NewLoan::starting_at(caller.user_id, book.id, Utc::now()))
            .await?;

        self.repository.books.adjust_copies_available(book.id, -1).await?;

        tracing::info!(
            loan_id = loan.id,
            user_id = caller.user_id,
            book_id = book.id,
            due_date = %loan.due_date,
            "book borrowed"
        );

        self.details(loan.id).await
    }

    /// Return a borrowed book
    pub async fn return_book(&self, caller: &UserClaims, loan_id: i32) -> AppResult<LoanDetails> {
        let loan = self
            .repository
            .loans
            .get_by_id(loan_id)
            .await?
            .filter(|loan| caller.can_access(loan.user_id))
            .ok_or_else(loan_not_found)?;

        if !loan.is_open() {
            return Err(AppError::Validation("Book already returned".to_string()));
        }

        let loan = self.repository.loans.mark_returned(loan.id, Utc::now()).await?;

        self.repository.books.adjust_copies_available(loan.book_id, 1).await?;

        tracing::info!(
            loan_id = loan.id,
            user_id = loan.user_id,
            book_id = loan.book_id,
            "book returned"
        );

        self.details(loan.id).await
    }

    async fn details(&self, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository
            .loans
            .get_details(loan_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Loan {} vanished after write", loan_id)))
    }
}

fn loan_not_found() -> AppError {
    AppError::NotFound("Loan not found".to_string())
}
