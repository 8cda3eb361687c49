//! Author endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::author::{Author, AuthorProfile, CreateAuthor, UpdateAuthor},
    AppState,
};

use super::{read_image, ImageForm, JsonBody, Preferred};

/// Register an author
#[utoipa::path(
    post,
    path = "/add-author",
    tag = "authors",
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_author(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let author = state.services.authors.add_author(data).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Update an author
#[utoipa::path(
    put,
    path = "/update-author/{id}",
    tag = "authors",
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body = UpdateAuthor,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(data): JsonBody<UpdateAuthor>,
) -> AppResult<Json<Author>> {
    let author = state.services.authors.update_author(id, data).await?;
    Ok(Json(author))
}

/// Delete an author without books
#[utoipa::path(
    delete,
    path = "/delete-author/{id}",
    tag = "authors",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Author still has books", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.services.authors.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/author/{id}",
    tag = "authors",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Author>> {
    let author = state.services.authors.get_author(id).await?;
    Ok(Json(author))
}

/// Author profile in the language asked for by `Accept-Language`
#[utoipa::path(
    get,
    path = "/author-profile/{id}",
    tag = "authors",
    params(
        ("id" = Uuid, Path, description = "Author ID"),
        ("Accept-Language" = Option<String>, Header, description = "`en` or `ar`, English by default")
    ),
    responses(
        (status = 200, description = "Localized profile", body = AuthorProfile),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author_profile(
    State(state): State<AppState>,
    Preferred(lang): Preferred,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AuthorProfile>> {
    let profile = state.services.authors.get_profile(id, lang).await?;
    Ok(Json(profile))
}

/// Upload a profile image
#[utoipa::path(
    post,
    path = "/author/{id}/image",
    tag = "authors",
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body(content = ImageForm, content_type = "multipart/form-data", description = "Image in the `image` field"),
    responses(
        (status = 200, description = "Image stored", body = Author),
        (status = 400, description = "Not an image or too large", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Author>> {
    let image = read_image(multipart).await?;
    let author = state.services.authors.set_profile_image(id, image).await?;
    Ok(Json(author))
}
