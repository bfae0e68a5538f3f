//! Authentication and access control.
//!
//! Sessions are HS256 JWTs carried either as a bearer token or in the `token`
//! cookie. Handlers that need a caller take a [`CurrentUser`]; role and ownership
//! checks are plain predicates called by the services.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::AppState;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Roles allowed to manage bootcamps and courses.
pub const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing material for session tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Keys from a secret that only lives as long as this process.
    pub fn random(ttl_days: i64) -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(&secret, ttl_days)
    }

    /// Issue a session token for `user_id`.
    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AppError::Internal(format!("Failed to sign token: {}", e))
        })
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Check a password against a stored hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts).or_else(|| cookie_token(parts)) else {
            return Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()));
        };

        let claims = state.tokens.verify(&token)?;
        match state.repo.get_user(&claims.sub).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                tracing::debug!("Token subject {} no longer exists", claims.sub);
                Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Reject callers whose role is not in `roles`.
pub fn authorize(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role.as_str()
        )))
    }
}

/// Reject callers that neither own the resource nor are admins.
pub fn ensure_owner(user: &User, owner_id: &str, action: &str) -> Result<(), AppError> {
    if user.role == Role::Admin || user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User {} is not authorized to {}",
            user.id, action
        )))
    }
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, days: i64) -> String {
    let expires = Utc::now() + Duration::days(days);
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; Expires={}",
        TOKEN_COOKIE,
        token,
        days * 24 * 60 * 60,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}
