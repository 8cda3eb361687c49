//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, circulation, health, kpi, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Maktaba API",
        version = "1.0.0",
        description = "Library management REST API: catalog, members, loans and subscriptions"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Circulation
        circulation::borrow_book,
        circulation::borrowed_books,
        circulation::return_book,
        circulation::subscribe_book,
        circulation::unsubscribe_book,
        // Books
        books::add_book,
        books::list_books,
        books::get_book,
        books::update_book,
        books::delete_book,
        books::upload_cover,
        books::publish_book,
        books::unpublish_book,
        // Authors
        authors::add_author,
        authors::update_author,
        authors::delete_author,
        authors::get_author,
        authors::get_author_profile,
        authors::upload_image,
        // Members
        members::add_member,
        members::update_member,
        members::delete_member,
        members::get_member_profile,
        // KPIs
        kpi::get_kpis,
    ),
    components(
        schemas(
            // Shared
            crate::models::LocalizedText,
            crate::models::LocalizedNote,
            crate::models::Lang,
            // Books
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Authors
            crate::models::author::Author,
            crate::models::author::AuthorProfile,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberProfile,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            // Circulation
            crate::models::loan::LoanEntry,
            crate::models::loan::LoanSummary,
            crate::models::loan::ReturnOutcome,
            crate::services::loans::ReturnReceipt,
            super::BookIdRequest,
            super::MessageResponse,
            super::LoanResponse,
            super::LoanListResponse,
            super::ReturnResponse,
            super::KpiResponse,
            super::ImageForm,
            // KPIs
            crate::models::kpi::Kpis,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::ErrorCode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "circulation", description = "Borrowing, returns and subscriptions"),
        (name = "books", description = "Catalog and publication"),
        (name = "authors", description = "Author directory"),
        (name = "members", description = "Member directory"),
        (name = "kpis", description = "Library-wide indicators")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
