//! Bootcamp API endpoints.

use axum::extract::{Multipart, Path, State};
use serde_json::Value;

use super::{ApiResponse, ApiResult, AppJson, QueryPairs};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Bootcamp, CreateBootcampRequest, UpdateBootcampRequest};
use crate::services::bootcamps::{self, PhotoUpload};
use crate::AppState;

/// Multipart field carrying the photo.
const PHOTO_FIELD: &str = "image";

/// GET /api/v1/bootcamps - List bootcamps with filters, projection, sort and paging.
pub async fn list_bootcamps(
    State(state): State<AppState>,
    QueryPairs(params): QueryPairs,
) -> ApiResult<Vec<Value>> {
    let listing = bootcamps::list(&state, &params).await?;
    let count = listing.count();
    Ok(ApiResponse::ok(listing.data)
        .with_count(count)
        .with_pagination(listing.pagination))
}

/// GET /api/v1/bootcamps/{id}
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Bootcamp> {
    Ok(ApiResponse::ok(bootcamps::get(&state, &id).await?))
}

/// POST /api/v1/bootcamps
pub async fn create_bootcamp(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<CreateBootcampRequest>,
) -> ApiResult<Bootcamp> {
    let bootcamp = bootcamps::create(&state, &user, request).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/{id}
pub async fn update_bootcamp(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateBootcampRequest>,
) -> ApiResult<Bootcamp> {
    Ok(ApiResponse::ok(
        bootcamps::update(&state, &user, &id, request).await?,
    ))
}

/// DELETE /api/v1/bootcamps/{id}
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    bootcamps::delete(&state, &user, &id).await?;
    Ok(ApiResponse::ok(serde_json::json!({})))
}

/// PUT /api/v1/bootcamps/{id}/photo - Multipart upload in the `image` field.
pub async fn upload_bootcamp_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<String> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        upload = Some(PhotoUpload {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("Please upload a file".to_string()))?;
    let file_name = bootcamps::upload_photo(&state, &user, &id, upload).await?;
    Ok(ApiResponse::ok(file_name))
}

/// GET /api/v1/bootcamps/radius/{zipcode}/{distance}
pub async fn bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Vec<Bootcamp>> {
    let found = bootcamps::within_radius(&state, &zipcode, &distance).await?;
    let count = found.len();
    Ok(ApiResponse::ok(found).with_count(count))
}
