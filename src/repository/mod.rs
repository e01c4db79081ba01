//! Repository layer for database operations
//!
//! Each store is an async trait so services can run against PostgreSQL in
//! production and against mocks or in-memory stores in tests.

pub mod books;
pub mod loans;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::{BookStore, BooksRepository};
pub use loans::{LoanStore, LoansRepository};
pub use users::{UserStore, UsersRepository};

/// Main repository struct holding the stores used by services
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(BooksRepository::new(pool.clone())),
            users: Arc::new(UsersRepository::new(pool.clone())),
            loans: Arc::new(LoansRepository::new(pool)),
        }
    }

    /// Assemble a repository from arbitrary store implementations
    pub fn with_stores(
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
        loans: Arc<dyn LoanStore>,
    ) -> Self {
        Self { books, users, loans }
    }
}
