use axum::extract::State;
use stockroom_api::{ApiError, ApiResponse, ApiResult};
use stockroom_auth::verify_password;

use super::JsonBody;
use crate::models::{CreateUserRequest, LoginRequest, LoginResponse, UserDetails};
use crate::server::AppState;

const BAD_CREDENTIALS: &str = "Invalid email or password";

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> ApiResult<ApiResponse<UserDetails>> {
    request.validate()?;
    let user = state.users.create(request).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    request.validate()?;
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error finding user");
            ApiError::internal("Error finding user")
        })?
        .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

    let hash = user.password.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            ApiError::internal("Error finding user")
        })?;
    match matches {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::unauthorized(BAD_CREDENTIALS)),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "stored password hash unreadable");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    }

    let token = state.jwt.issue(&user.id, user.role).map_err(|e| {
        tracing::error!(error = %e, "Error generating token");
        ApiError::internal("Error generating token")
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token,
            user: user.summary(),
        },
    ))
}
