//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Borrowing API",
        version = "0.1.0",
        description = "Book lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        health::health_check,
        auth::login,
        auth::me,
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_book,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            loans::CreateLoanRequest,
            crate::models::loan::LoanDetails,
            crate::models::book::Book,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "borrow", description = "Borrowing and returning books")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
