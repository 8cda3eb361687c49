//! Member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, MemberProfile, UpdateMember},
    AppState,
};

use super::JsonBody;

/// Register a member
#[utoipa::path(
    post,
    path = "/add-member",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.members.add_member(data).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Update a member's personal details
#[utoipa::path(
    put,
    path = "/update-member/{id}",
    tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(data): JsonBody<UpdateMember>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.update_member(id, data).await?;
    Ok(Json(member))
}

#[utoipa::path(
    delete,
    path = "/delete-member/{id}",
    tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Member still has loans", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.services.members.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/member-profile/{id}",
    tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member profile", body = MemberProfile),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MemberProfile>> {
    let profile = state.services.members.get_profile(id).await?;
    Ok(Json(profile))
}
