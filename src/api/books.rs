//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, BookSummary, CreateBook, UpdateBook},
    AppState,
};

use super::{read_image, ImageForm, JsonBody, MessageResponse};

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/add-book",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// List books, newest first
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = Vec<BookSummary>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookSummary>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/book/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/book/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book or author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book changed concurrently", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(data): JsonBody<UpdateBook>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.update_book(id, data).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/book/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a cover image
#[utoipa::path(
    post,
    path = "/book/{id}/cover",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body(content = ImageForm, content_type = "multipart/form-data", description = "Image in the `image` field"),
    responses(
        (status = 200, description = "Cover stored", body = Book),
        (status = 400, description = "Not an image or too large", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_cover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Book>> {
    let image = read_image(multipart).await?;
    let book = state.services.catalog.set_cover(id, image).await?;
    Ok(Json(book))
}

/// Publish a book and notify its subscribers
#[utoipa::path(
    post,
    path = "/book/{id}/publish",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book published", body = MessageResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already published", body = crate::error::ErrorResponse)
    )
)]
pub async fn publish_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.services.publication.publish(id).await?;
    Ok(Json(MessageResponse::new("Book published and subscribers notified.")))
}

/// Withdraw a published book
#[utoipa::path(
    post,
    path = "/book/{id}/unpublish",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book unpublished", body = MessageResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already unpublished", body = crate::error::ErrorResponse)
    )
)]
pub async fn unpublish_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.services.publication.unpublish(id).await?;
    Ok(Json(MessageResponse::new("Book unpublished successfully.")))
}
