//! Data models for the borrowing server

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use loan::{Loan, LoanDetails, NewLoan};
pub use user::{User, UserClaims};
