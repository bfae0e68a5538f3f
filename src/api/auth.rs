//! Authentication endpoints.

use axum::extract::{Path, State};

use super::{ApiResponse, ApiResult, AppJson};
use crate::auth::{session_cookie, CurrentUser};
use crate::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, User,
};
use crate::services::accounts::{self, Session};
use crate::AppState;

fn session_response(state: &AppState, session: Session) -> ApiResponse<User> {
    let cookie = session_cookie(&session.token, state.config.cookie_expire_days);
    ApiResponse::ok(session.user).with_session(session.token, cookie)
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> ApiResult<User> {
    let session = accounts::register(&state, request).await?;
    Ok(session_response(&state, session))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<User> {
    let session = accounts::login(&state, request).await?;
    Ok(session_response(&state, session))
}

/// GET /api/v1/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::ok(user))
}

/// POST /api/v1/auth/forgotpassword
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> ApiResult<()> {
    accounts::forgot_password(&state, request).await?;
    Ok(ApiResponse::<()>::message(
        "Please check your email to reset your password",
    ))
}

/// GET /api/v1/auth/resetpassword/{token}
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<String> {
    let user_id = accounts::check_reset_token(&state, &token).await?;
    Ok(ApiResponse::ok(user_id))
}

/// POST /api/v1/auth/resetpassword/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> ApiResult<User> {
    let session = accounts::reset_password(&state, &token, request).await?;
    Ok(session_response(&state, session))
}
