//! Course API endpoints.

use axum::extract::{Path, State};
use serde_json::Value;

use super::{ApiResponse, ApiResult, AppJson, QueryPairs};
use crate::auth::CurrentUser;
use crate::models::{Course, CreateCourseRequest, UpdateCourseRequest};
use crate::services::courses;
use crate::AppState;

/// GET /api/v1/courses
pub async fn list_courses(
    State(state): State<AppState>,
    QueryPairs(params): QueryPairs,
) -> ApiResult<Vec<Value>> {
    let listing = courses::list(&state, &params).await?;
    let count = listing.count();
    Ok(ApiResponse::ok(listing.data)
        .with_count(count)
        .with_pagination(listing.pagination))
}

/// GET /api/v1/courses/{id}/courses - All courses of a bootcamp.
pub async fn list_bootcamp_courses(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Vec<Course>> {
    let found = courses::list_for_bootcamp(&state, &bootcamp_id).await?;
    let count = found.len();
    Ok(ApiResponse::ok(found).with_count(count))
}

/// GET /api/v1/courses/{id}
pub async fn get_course(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Course> {
    Ok(ApiResponse::ok(courses::get(&state, &id).await?))
}

/// POST /api/v1/courses - The parent bootcamp comes from the body.
pub async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<CreateCourseRequest>,
) -> ApiResult<Course> {
    let course = courses::create(&state, &user, None, request).await?;
    Ok(ApiResponse::created(course))
}

/// POST /api/v1/bootcamps/{id}/courses
pub async fn create_bootcamp_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bootcamp_id): Path<String>,
    AppJson(request): AppJson<CreateCourseRequest>,
) -> ApiResult<Course> {
    let course = courses::create(&state, &user, Some(&bootcamp_id), request).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateCourseRequest>,
) -> ApiResult<Course> {
    Ok(ApiResponse::ok(
        courses::update(&state, &user, &id, request).await?,
    ))
}

/// DELETE /api/v1/courses/{id}
pub async fn delete_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    courses::delete(&state, &user, &id).await?;
    Ok(ApiResponse::ok(serde_json::json!({})))
}
