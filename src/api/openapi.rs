//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{activity_logs, auth, books, borrowings, categories, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library management REST API: catalog, users and borrowing requests"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        auth::update_profile,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrowing requests
        borrowings::list_requests,
        borrowings::get_request,
        borrowings::create_request,
        borrowings::approve_request,
        borrowings::reject_request,
        borrowings::return_book,
        borrowings::extend_book,
        // Activity
        activity_logs::list_activity_logs,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::UserQuery,
            crate::models::user::CreateUser,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateProfile,
            // Catalog
            crate::models::category::Category,
            crate::models::category::CategoryQuery,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Borrowing
            crate::models::borrowing::BorrowingRequest,
            crate::models::borrowing::BorrowingDetail,
            crate::models::borrowing::RequestStatus,
            crate::models::borrowing::DetailStatus,
            crate::models::borrowing::BorrowingRequestQuery,
            crate::models::borrowing::CreateBorrowingRequest,
            // Activity
            crate::models::activity_log::ActivityLog,
            crate::models::activity_log::ActivityAction,
            crate::models::activity_log::ActivityLogQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "categories", description = "Book categories"),
        (name = "books", description = "Book catalog"),
        (name = "borrowings", description = "Borrowing requests"),
        (name = "activity", description = "Activity log")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
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
