//! API handlers for Maktaba REST endpoints

pub mod authors;
pub mod books;
pub mod circulation;
pub mod health;
pub mod kpi;
pub mod members;
pub mod openapi;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Request},
    http::{header::ACCEPT_LANGUAGE, request::Parts, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::Multipart;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{Kpis, Lang, LoanEntry, LoanSummary},
    services::{loans::ReturnReceipt, uploads::ImageUpload},
    AppState,
};

/// Header carrying the acting member's id on circulation requests
pub const MEMBER_ID_HEADER: &str = "member-id";

/// Multipart field holding an uploaded image
pub const IMAGE_FIELD: &str = "image";

/// Extractor for the member a circulation request acts on
pub struct MemberIdentity(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MemberIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(MEMBER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", MEMBER_ID_HEADER)))?;

        let id = Uuid::parse_str(value.trim())
            .map_err(|_| AppError::BadRequest(format!("Invalid {} header", MEMBER_ID_HEADER)))?;

        Ok(MemberIdentity(id))
    }
}

/// Preferred response language from `Accept-Language`, English when absent
pub struct Preferred(pub Lang);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Preferred {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Lang::from_accept_language)
            .unwrap_or_default();
        Ok(Preferred(lang))
    }
}

/// JSON request body; malformed or incomplete bodies are reported as validation errors
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Multipart form carrying an image upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// Body of circulation requests
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookIdRequest {
    pub book_id: Uuid,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Successful response wrapping a payload
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    LoanResponse = DataResponse<LoanEntry>,
    LoanListResponse = DataResponse<Vec<LoanSummary>>,
    ReturnResponse = DataResponse<ReturnReceipt>,
    KpiResponse = DataResponse<Kpis>
)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Read the `image` field of a multipart form
pub async fn read_image(mut multipart: Multipart) -> AppResult<ImageUpload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        IMAGE_FIELD
    )))
}

fn multipart_error(e: axum_extra::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation {
            code: ErrorCode::FileTooLarge,
            message: "The uploaded file is too large".to_string(),
        }
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave room for multipart framing around the image itself
    let upload_limit = DefaultBodyLimit::max(state.services.uploads.max_file_size() + 64 * 1024);

    let image_routes = Router::new()
        .route("/book/:id/cover", post(books::upload_cover))
        .route("/author/:id/image", post(authors::upload_image))
        .layer(upload_limit);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Circulation
        .route("/borrow-book", post(circulation::borrow_book))
        .route("/borrowed-books", get(circulation::borrowed_books))
        .route("/return-book", post(circulation::return_book))
        .route("/subscribe-book", post(circulation::subscribe_book))
        .route("/unsubscribe-book", post(circulation::unsubscribe_book))
        // Catalog
        .route("/add-book", post(books::add_book))
        .route("/books", get(books::list_books))
        .route("/book/:id", get(books::get_book))
        .route("/book/:id", put(books::update_book))
        .route("/book/:id", delete(books::delete_book))
        .route("/book/:id/publish", post(books::publish_book))
        .route("/book/:id/unpublish", post(books::unpublish_book))
        // Authors
        .route("/add-author", post(authors::add_author))
        .route("/update-author/:id", put(authors::update_author))
        .route("/delete-author/:id", delete(authors::delete_author))
        .route("/author/:id", get(authors::get_author))
        .route("/author-profile/:id", get(authors::get_author_profile))
        // Members
        .route("/add-member", post(members::add_member))
        .route("/update-member/:id", put(members::update_member))
        .route("/delete-member/:id", delete(members::delete_member))
        .route("/member-profile/:id", get(members::get_member_profile))
        // Indicators
        .route("/kpis", get(kpi::get_kpis))
        .merge(image_routes)
        .with_state(state.clone());

    let uploads = ServeDir::new(state.services.uploads.directory());

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/uploads", uploads)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
