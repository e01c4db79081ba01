//! Book (catalog entry) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Book as stored in the catalog.
///
/// The catalog owns the record; the lending side only reads it and moves
/// `copies_available` up and down as loans open and close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: i32,
    pub copies_available: i32,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.copies_available >= 1
    }
}
