use axum::extract::State;
use stockroom_api::{ApiResponse, ApiResult, Pagination, Paginated};
use stockroom_auth::{AuthContext, ensure_not_outranked, ensure_self_or_privileged};

use super::{JsonBody, QueryParams, UserId, read_message};
use crate::models::{UpdateUserRequest, UserDetails, UserListParams, UserQuery, UserSummary};
use crate::server::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<UserListParams>,
) -> ApiResult<Paginated<UserSummary>> {
    let query = UserQuery::try_from(params)?;
    let (page, status) = state.users.list(&query).await?;
    let message = read_message(
        status.is_hit(),
        "Users fetched from cache",
        "Users fetched successfully",
    );
    let pagination = Pagination::new(query.page.page, query.page.limit, page.total);
    Ok(ApiResponse::paginated(message, page.items, pagination).with_cache_status(status))
}

/// Ownership is checked before the cache so a `user` never sees another
/// user's cached record.
pub async fn get_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    UserId(id): UserId,
) -> ApiResult<ApiResponse<UserDetails>> {
    ensure_self_or_privileged(&ctx, &id)?;

    let (user, status) = state.users.get(&id).await?;
    let message = read_message(
        status.is_hit(),
        "User details fetched from cache",
        "User details fetched successfully",
    );
    Ok(ApiResponse::ok(message, user).with_cache_status(status))
}

/// Staff may edit other accounts, but never one that outranks them.
pub async fn update_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    UserId(id): UserId,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> ApiResult<ApiResponse<UserDetails>> {
    ensure_self_or_privileged(&ctx, &id)?;
    if !ctx.is_self(&id) {
        let target_role = state.users.role_of(&id).await?;
        ensure_not_outranked(&ctx, &id, target_role)?;
    }
    request.validate()?;

    let user = state.users.update(&id, &request).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> ApiResult<ApiResponse<()>> {
    state.users.delete(&id).await?;
    Ok(ApiResponse::message_only("User successfully deleted"))
}
