//! Registration, login and password reset.

use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::auth::{hash_password, verify_password};
use crate::db::now_timestamp;
use crate::errors::AppError;
use crate::mailer::password_reset_mail;
use crate::models::{
    normalize_email, ForgotPasswordRequest, LoginRequest, NewUser, RegisterRequest,
    ResetPasswordRequest, Role, User,
};
use crate::AppState;

/// How long a password-reset token stays valid.
pub const RESET_TOKEN_TTL_HOURS: i64 = 2;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub async fn register(state: &AppState, mut request: RegisterRequest) -> Result<Session, AppError> {
    request.normalize();
    request.validate()?;

    let role = request.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(AppError::Forbidden(
            "The admin role can not be self-assigned".to_string(),
        ));
    }

    if state.repo.find_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::DuplicateKey(
            "Duplicate field value entered for email".to_string(),
        ));
    }

    let password_hash = hash_password(request.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(&NewUser {
            name: request.name,
            email: request.email,
            role,
            password_hash,
        })
        .await?;

    tracing::info!("Registered user {} with role {}", user.id, user.role.as_str());
    start_session(state, user)
}

pub async fn login(state: &AppState, request: LoginRequest) -> Result<Session, AppError> {
    let (Some(email), Some(password)) = (
        request.email.filter(|e| !e.trim().is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Please provide an email and password"));
    };

    let Some(user) = state.repo.find_user_by_email(&normalize_email(&email)).await? else {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::debug!("Wrong password for user {}", user.id);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    start_session(state, user)
}

/// Issue a reset token and mail the link. Only a digest of the token is stored.
pub async fn forgot_password(
    state: &AppState,
    request: ForgotPasswordRequest,
) -> Result<(), AppError> {
    request.validate()?;
    let email = normalize_email(&request.email);

    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        return Err(AppError::NotFound(format!("There is no user with email {}", email)));
    };

    let token = new_reset_token();
    let expires_at = (Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    state
        .repo
        .set_reset_token(&user.id, &reset_digest(&token), &expires_at)
        .await?;

    let link = format!(
        "{}/api/v1/auth/resetpassword/{}",
        state.config.public_url.trim_end_matches('/'),
        token
    );

    if let Err(e) = state.mailer.send(password_reset_mail(&user.email, &link)).await {
        tracing::error!("Failed to send reset mail to user {}: {}", user.id, e);
        state.repo.clear_reset_token(&user.id).await?;
        return Err(AppError::Internal("Email could not be sent".to_string()));
    }

    tracing::info!("Password reset requested for user {}", user.id);
    Ok(())
}

/// Check a reset token without consuming it, returning the user id it belongs to.
pub async fn check_reset_token(state: &AppState, token: &str) -> Result<String, AppError> {
    let user = state
        .repo
        .find_user_by_reset_digest(&reset_digest(token), &now_timestamp())
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_RESET_TOKEN.to_string()))?;
    Ok(user.id)
}

/// Set a new password, consuming the reset token in the same statement.
pub async fn reset_password(
    state: &AppState,
    token: &str,
    request: ResetPasswordRequest,
) -> Result<Session, AppError> {
    request.validate()?;
    let digest = reset_digest(token);

    if let Some(claimed) = &request.id {
        let holder = check_reset_token(state, token).await?;
        if holder != claimed.trim() {
            tracing::warn!("Reset token for user {} presented with id {}", holder, claimed);
            return Err(AppError::NotFound(INVALID_RESET_TOKEN.to_string()));
        }
    }

    let password_hash = hash_password(request.password, state.config.bcrypt_cost).await?;
    let user_id = state
        .repo
        .consume_reset_token(&digest, &now_timestamp(), &password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_RESET_TOKEN.to_string()))?;

    let user = state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_RESET_TOKEN.to_string()))?;

    tracing::info!("Password reset for user {}", user.id);
    start_session(state, user)
}

fn start_session(state: &AppState, user: User) -> Result<Session, AppError> {
    let token = state.tokens.issue(&user.id)?;
    Ok(Session { user, token })
}

fn new_reset_token() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 digest of a reset token, as stored.
fn reset_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_shape() {
        let token = new_reset_token();
        assert_eq!(token.len(), 20);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, new_reset_token());
    }

    #[test]
    fn test_reset_digest_is_stable() {
        assert_eq!(reset_digest("abc"), reset_digest("abc"));
        assert_ne!(reset_digest("abc"), reset_digest("abd"));
        assert_eq!(
            reset_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
