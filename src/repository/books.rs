//! Books repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    /// Add `delta` to the available-copies counter
    async fn adjust_copies_available(&self, id: i32, delta: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, isbn, total_copies, copies_available
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn adjust_copies_available(&self, id: i32, delta: i32) -> AppResult<()> {
        // Arithmetic in SQL, no read-modify-write round trip
        let result = sqlx::query(
            "UPDATE books SET copies_available = copies_available + $2 WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        Ok(())
    }
}
