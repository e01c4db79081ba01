//! In-memory stores and request helpers shared by the API tests

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;

use borrowing_server::{
    api,
    config::AppConfig,
    error::AppResult,
    models::{Book, Loan, LoanDetails, NewLoan, User, UserClaims},
    repository::{BookStore, LoanStore, Repository, UserStore},
    services::{auth::hash_password, Services},
    AppError, AppState,
};

#[derive(Default)]
struct Tables {
    books: HashMap<i32, Book>,
    users: HashMap<i32, User>,
    loans: Vec<Loan>,
}

/// Books, users and borrow records kept in memory
#[derive(Default)]
pub struct MemoryLibrary {
    tables: Mutex<Tables>,
}

impl MemoryLibrary {
    pub fn add_book(&self, id: i32, title: &str, copies: i32) {
        let book = Book {
            id,
            title: title.to_string(),
            author: "Anonymous".to_string(),
            isbn: None,
            total_copies: copies,
            copies_available: copies,
        };
        self.tables.lock().unwrap().books.insert(id, book);
    }

    /// User that only authenticates through pre-signed tokens
    pub fn add_user(&self, id: i32, username: &str, is_staff: bool) {
        self.insert_user(id, username, "!".to_string(), is_staff);
    }

    pub fn add_user_with_password(&self, id: i32, username: &str, password: &str, is_staff: bool) {
        self.insert_user(id, username, hash_password(password).unwrap(), is_staff);
    }

    fn insert_user(&self, id: i32, username: &str, password_hash: String, is_staff: bool) {
        let user = User {
            id,
            username: username.to_string(),
            password_hash,
            is_staff,
            date_joined: Utc::now(),
        };
        self.tables.lock().unwrap().users.insert(id, user);
    }

    pub fn copies_available(&self, book_id: i32) -> i32 {
        self.tables.lock().unwrap().books[&book_id].copies_available
    }

    pub fn loan_count(&self) -> usize {
        self.tables.lock().unwrap().loans.len()
    }

    fn details(tables: &Tables, loan: &Loan) -> LoanDetails {
        LoanDetails::from_parts(
            loan.clone(),
            tables.users[&loan.user_id].username.clone(),
            tables.books[&loan.book_id].clone(),
        )
    }

    fn newest_first(tables: &Tables, keep: impl Fn(&Loan) -> bool) -> Vec<LoanDetails> {
        tables
            .loans
            .iter()
            .rev()
            .filter(|loan| keep(loan))
            .map(|loan| Self::details(tables, loan))
            .collect()
    }
}

#[async_trait]
impl BookStore for MemoryLibrary {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables.lock().unwrap().books.get(&id).cloned())
    }

    async fn adjust_copies_available(&self, id: i32, delta: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let book = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        book.copies_available += delta;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryLibrary {
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl LoanStore for MemoryLibrary {
    async fn list_all(&self) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(&tables, |_| true))
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(&tables, |loan| loan.user_id == user_id))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.loans.iter().find(|loan| loan.id == id).cloned())
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .loans
            .iter()
            .find(|loan| loan.id == id)
            .map(|loan| Self::details(&tables, loan)))
    }

    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .loans
            .iter()
            .any(|loan| loan.user_id == user_id && loan.book_id == book_id && loan.is_open()))
    }

    async fn create(&self, new: NewLoan) -> AppResult<Loan> {
        let mut tables = self.tables.lock().unwrap();
        let loan = Loan {
            id: tables.loans.len() as i32 + 1,
            user_id: new.user_id,
            book_id: new.book_id,
            borrowed_at: new.borrowed_at,
            due_date: new.due_date,
            returned_at: None,
            is_returned: false,
        };
        tables.loans.push(loan.clone());
        Ok(loan)
    }

    async fn mark_returned(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        let mut tables = self.tables.lock().unwrap();
        let loan = tables
            .loans
            .iter_mut()
            .find(|loan| loan.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        loan.is_returned = true;
        loan.returned_at = Some(returned_at);
        Ok(loan.clone())
    }
}

/// Router wired to a fresh in-memory library
pub struct TestApp {
    pub router: Router,
    pub library: Arc<MemoryLibrary>,
    config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let library = Arc::new(MemoryLibrary::default());
        let config = AppConfig::default();
        let repository =
            Repository::with_stores(library.clone(), library.clone(), library.clone());
        let services = Services::new(repository, config.auth.clone());
        let state = AppState {
            config: Arc::new(config.clone()),
            services: Arc::new(services),
        };

        Self {
            router: api::router(state),
            library,
            config,
        }
    }

    /// Bearer token for a user already added to the library
    pub fn token_for(&self, user_id: i32, username: &str, is_staff: bool) -> String {
        let claims = UserClaims {
            sub: username.to_string(),
            user_id,
            is_staff,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
        };
        claims.create_token(&self.config.auth.jwt_secret).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        match body {
            Some(json) => {
                self.request_raw(method, uri, token, Some("application/json"), json.to_string())
                    .await
            }
            None => self.request_raw(method, uri, token, None, String::new()).await,
        }
    }

    /// Send an arbitrary body; the response is parsed as JSON, `Null` when it is not JSON
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: String,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
