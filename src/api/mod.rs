//! REST API module.
//!
//! Handlers are thin: they extract, call a service and wrap the result in the
//! success envelope.

mod auth;
mod bootcamps;
mod courses;

pub use auth::*;
pub use bootcamps::*;
pub use courses::*;

use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::query::Pagination;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
    #[serde(skip)]
    cookie: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            pagination: None,
            token: None,
            message: None,
            status: StatusCode::OK,
            cookie: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Attach a session token to the body and as an HTTP-only cookie.
    pub fn with_session(mut self, token: String, cookie: String) -> Self {
        self.token = Some(token);
        self.cookie = Some(cookie);
        self
    }
}

impl ApiResponse<()> {
    /// A success envelope with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            data: None,
            ..Self::ok(())
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        let cookie = self.cookie.clone();
        let mut response = (status, Json(self)).into_response();

        if let Some(cookie) = cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!("Invalid session cookie header: {}", e),
            }
        }

        response
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Ordered query-string pairs, as fed to the list query builder.
#[derive(Debug, Deserialize, FromRequestParts)]
#[serde(transparent)]
#[from_request(via(Query), rejection(AppError))]
pub struct QueryPairs(pub Vec<(String, String)>);
