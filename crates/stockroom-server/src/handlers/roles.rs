use std::collections::BTreeMap;

use axum::extract::State;
use stockroom_api::{ApiError, ApiResponse, ApiResult, FieldError};
use stockroom_auth::{AuthContext, Permission, Role, role_table};
use uuid::Uuid;

use super::JsonBody;
use crate::models::{AssignRoleRequest, UserSummary};
use crate::server::AppState;

pub async fn list_roles() -> ApiResponse<BTreeMap<Role, Vec<Permission>>> {
    ApiResponse::ok("Roles retrieved successfully", role_table())
}

pub async fn assign_role(
    State(state): State<AppState>,
    ctx: AuthContext,
    JsonBody(request): JsonBody<AssignRoleRequest>,
) -> ApiResult<ApiResponse<UserSummary>> {
    if ctx.role != Role::MasterAdmin {
        return Err(ApiError::forbidden("Only master admin can modify roles"));
    }

    let (user_id, role) = validate_assignment(&request)?;
    let user = state.users.assign_role(&user_id, role).await?;
    tracing::info!(by = %ctx.user_id, user_id = %user.id, role = %role, "role assigned");
    Ok(ApiResponse::ok("User role updated successfully", user))
}

/// Missing fields are reported first; the role and id shapes are only
/// checked once both are present.
fn validate_assignment(request: &AssignRoleRequest) -> ApiResult<(String, Role)> {
    let user_id = request.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let role = request.role.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (Some(user_id), Some(role)) = (user_id, role) else {
        let mut errors = Vec::new();
        if user_id.is_none() {
            errors.push(FieldError::new("user_id", "This field is required"));
        }
        if role.is_none() {
            errors.push(FieldError::new("role", "This field is required"));
        }
        return Err(ApiError::validation(errors));
    };

    let role: Role = role.parse().map_err(|_| {
        ApiError::validation(vec![FieldError::new(
            "role",
            format!("Role must be one of: {}", Role::names().join(", ")),
        )])
    })?;

    let user_id = Uuid::parse_str(user_id).map_err(|_| {
        ApiError::validation(vec![FieldError::new("user_id", "Invalid user ID format")])
    })?;

    Ok((user_id.hyphenated().to_string(), role))
}
