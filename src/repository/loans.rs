//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, LoanDetailsRow, NewLoan},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Every loan, newest first
    async fn list_all(&self) -> AppResult<Vec<LoanDetails>>;

    /// Loans owned by one user, newest first
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>>;

    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>>;

    /// Whether the user holds an unreturned loan for the book
    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool>;

    async fn create(&self, loan: NewLoan) -> AppResult<Loan>;

    /// Flag the loan returned and stamp `returned_at`
    async fn mark_returned(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan>;
}

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.username, r.book_id,
           b.title, b.author, b.isbn, b.total_copies, b.copies_available,
           r.borrowed_at, r.due_date, r.returned_at, r.is_returned
    FROM borrow_records r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn list_all(&self) -> AppResult<Vec<LoanDetails>> {
        let sql = format!("{} ORDER BY r.borrowed_at DESC, r.id DESC", LOAN_DETAILS_SELECT);
        let rows = sqlx::query_as::<_, LoanDetailsRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let sql = format!(
            "{} WHERE r.user_id = $1 ORDER BY r.borrowed_at DESC, r.id DESC",
            LOAN_DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, LoanDetailsRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(loan)
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let sql = format!("{} WHERE r.id = $1", LOAN_DETAILS_SELECT);
        let row = sqlx::query_as::<_, LoanDetailsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_records
                WHERE user_id = $1 AND book_id = $2 AND is_returned = FALSE
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, loan: NewLoan) -> AppResult<Loan> {
        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrowed_at, due_date, is_returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn mark_returned(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE borrow_records
            SET is_returned = TRUE, returned_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(returned_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }
}
