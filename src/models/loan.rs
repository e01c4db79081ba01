//! Loan (borrow record) model and related types

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::Book;

/// Fixed lending period, in days.
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Due date for a loan starting at `borrowed_at`.
pub fn due_date_from(borrowed_at: DateTime<Utc>) -> NaiveDate {
    borrowed_at.date_naive() + Duration::days(LOAN_PERIOD_DAYS)
}

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        !self.is_returned
    }
}

/// Loan about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
}

impl NewLoan {
    pub fn starting_at(user_id: i32, book_id: i32, borrowed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            book_id,
            borrowed_at,
            due_date: due_date_from(borrowed_at),
        }
    }
}

/// Loan representation returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    /// Borrowing user ID
    pub user: i32,
    /// Borrowing user's username
    pub user_username: String,
    /// Borrowed book ID
    pub book: i32,
    pub book_details: Book,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl LoanDetails {
    pub fn from_parts(loan: Loan, username: String, book: Book) -> Self {
        Self {
            id: loan.id,
            user: loan.user_id,
            user_username: username,
            book: loan.book_id,
            book_details: book,
            borrowed_at: loan.borrowed_at,
            due_date: loan.due_date,
            returned_at: loan.returned_at,
            is_returned: loan.is_returned,
        }
    }
}

/// Internal row structure for loan queries joined with users and books
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    id: i32,
    user_id: i32,
    username: String,
    book_id: i32,
    title: String,
    author: String,
    isbn: Option<String>,
    total_copies: i32,
    copies_available: i32,
    borrowed_at: DateTime<Utc>,
    due_date: NaiveDate,
    returned_at: Option<DateTime<Utc>>,
    is_returned: bool,
}

impl From<LoanDetailsRow> for LoanDetails {
    fn from(row: LoanDetailsRow) -> Self {
        LoanDetails {
            id: row.id,
            user: row.user_id,
            user_username: row.username,
            book: row.book_id,
            book_details: Book {
                id: row.book_id,
                title: row.title,
                author: row.author,
                isbn: row.isbn,
                total_copies: row.total_copies,
                copies_available: row.copies_available,
            },
            borrowed_at: row.borrowed_at,
            due_date: row.due_date,
            returned_at: row.returned_at,
            is_returned: row.is_returned,
        }
    }
}
