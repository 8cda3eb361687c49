//! Borrowing, return and subscription endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, AppState};

use super::{
    BookIdRequest, DataResponse, JsonBody, LoanListResponse, LoanResponse, MemberIdentity,
    MessageResponse, ReturnResponse,
};

/// Borrow a copy of a book
#[utoipa::path(
    post,
    path = "/borrow-book",
    tag = "circulation",
    params(("member-id" = uuid::Uuid, Header, description = "Borrowing member")),
    request_body = BookIdRequest,
    responses(
        (status = 200, description = "Loan opened", body = LoanResponse),
        (status = 404, description = "Member or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Not borrowable, no copies left or already borrowed", body = crate::error::ErrorResponse),
        (status = 422, description = "Member is below the book's minimum age", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    JsonBody(request): JsonBody<BookIdRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .services
        .loans
        .borrow_book(member_id, request.book_id)
        .await?;
    Ok(Json(DataResponse::new(loan)))
}

/// Active loans of the member, soonest due first
#[utoipa::path(
    get,
    path = "/borrowed-books",
    tag = "circulation",
    params(("member-id" = uuid::Uuid, Header, description = "Member")),
    responses(
        (status = 200, description = "Loan summaries", body = LoanListResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrowed_books(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
) -> AppResult<Json<LoanListResponse>> {
    let loans = state.services.loans.active_loans(member_id).await?;
    Ok(Json(DataResponse::new(loans)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return-book",
    tag = "circulation",
    params(("member-id" = uuid::Uuid, Header, description = "Returning member")),
    request_body = BookIdRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Member, book or loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    JsonBody(request): JsonBody<BookIdRequest>,
) -> AppResult<Json<ReturnResponse>> {
    let receipt = state
        .services
        .loans
        .return_book(member_id, request.book_id)
        .await?;
    Ok(Json(DataResponse::new(receipt)))
}

/// Subscribe to a book
#[utoipa::path(
    post,
    path = "/subscribe-book",
    tag = "circulation",
    params(("member-id" = uuid::Uuid, Header, description = "Subscribing member")),
    request_body = BookIdRequest,
    responses(
        (status = 200, description = "Subscribed", body = MessageResponse),
        (status = 404, description = "Member or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already subscribed", body = crate::error::ErrorResponse)
    )
)]
pub async fn subscribe_book(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    JsonBody(request): JsonBody<BookIdRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .subscriptions
        .subscribe(member_id, request.book_id)
        .await?;
    Ok(Json(MessageResponse::new("Subscribed to the book successfully.")))
}

/// Unsubscribe from a book
#[utoipa::path(
    post,
    path = "/unsubscribe-book",
    tag = "circulation",
    params(("member-id" = uuid::Uuid, Header, description = "Member")),
    request_body = BookIdRequest,
    responses(
        (status = 200, description = "Unsubscribed, or was not subscribed", body = MessageResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn unsubscribe_book(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    JsonBody(request): JsonBody<BookIdRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .subscriptions
        .unsubscribe(member_id, request.book_id)
        .await?;
    Ok(Json(MessageResponse::new("Unsubscribed from the book successfully.")))
}
