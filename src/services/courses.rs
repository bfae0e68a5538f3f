//! Course operations and the bootcamp average-cost aggregate.

use validator::Validate;

use crate::auth::{authorize, ensure_owner, PUBLISHERS};
use crate::db::COURSE_SCHEMA;
use crate::errors::AppError;
use crate::models::{
    parse_id, Course, CreateCourseRequest, MinimumSkill, NewCourse, UpdateCourseRequest, User,
};
use crate::query::{ListQuery, Listing};
use crate::AppState;

/// Create a course under `bootcamp_id`, or under the bootcamp named in the body.
pub async fn create(
    state: &AppState,
    user: &User,
    bootcamp_id: Option<&str>,
    mut request: CreateCourseRequest,
) -> Result<Course, AppError> {
    authorize(user, PUBLISHERS)?;

    let raw_id = bootcamp_id
        .map(str::to_string)
        .or_else(|| request.bootcamp.clone())
        .ok_or_else(|| AppError::validation("Please add a bootcamp"))?;
    let id = parse_id(&raw_id)?;

    let refused = || AppError::Forbidden(format!("You can not create a course for bootcamp {}", id));
    let bootcamp = state.repo.get_bootcamp(&id).await?.ok_or_else(refused)?;
    ensure_owner(user, &bootcamp.user, "add a course to this bootcamp").map_err(|_| refused())?;

    request.normalize();
    request.validate()?;

    let course = state
        .repo
        .insert_course(&NewCourse {
            bootcamp_id: bootcamp.id.clone(),
            user: bootcamp.user.clone(),
            title: request.title,
            description: request.description,
            weeks: request.weeks.unwrap_or(1),
            tuition: request.tuition.unwrap_or(0),
            minimum_skill: request.minimum_skill.unwrap_or(MinimumSkill::Beginner),
            scholarship_available: request.scholarship_available,
        })
        .await?;

    tracing::info!("User {} created course {} in bootcamp {}", user.id, course.id, bootcamp.id);
    refresh_average_cost(state, &bootcamp.id).await;
    Ok(course)
}

pub async fn get(state: &AppState, raw_id: &str) -> Result<Course, AppError> {
    fetch(state, raw_id).await
}

pub async fn list(state: &AppState, params: &[(String, String)]) -> Result<Listing, AppError> {
    let query = ListQuery::parse(&COURSE_SCHEMA, params)?;
    let (courses, total) = state.repo.list_courses(&query).await?;
    query.listing(&courses, total)
}

/// All courses of one bootcamp. A bootcamp without courses is reported as not found.
pub async fn list_for_bootcamp(state: &AppState, raw_id: &str) -> Result<Vec<Course>, AppError> {
    let id = parse_id(raw_id)?;
    let courses = state.repo.list_courses_for_bootcamp(&id).await?;
    if courses.is_empty() {
        return Err(AppError::NotFound(format!("No courses found for bootcamp {}", id)));
    }
    Ok(courses)
}

pub async fn update(
    state: &AppState,
    user: &User,
    raw_id: &str,
    mut request: UpdateCourseRequest,
) -> Result<Course, AppError> {
    authorize(user, PUBLISHERS)?;
    let mut course = fetch(state, raw_id).await?;
    ensure_owner(user, &course.user, "update this course")?;

    request.normalize();
    request.validate()?;

    if let Some(title) = request.title {
        course.title = title;
    }
    if let Some(description) = request.description {
        course.description = description;
    }
    if let Some(weeks) = request.weeks {
        course.weeks = weeks;
    }
    if let Some(tuition) = request.tuition {
        course.tuition = tuition;
    }
    if let Some(minimum_skill) = request.minimum_skill {
        course.minimum_skill = minimum_skill;
    }
    if let Some(scholarship_available) = request.scholarship_available {
        course.scholarship_available = scholarship_available;
    }

    state.repo.update_course(&course).await?;
    tracing::info!("User {} updated course {}", user.id, course.id);

    refresh_average_cost(state, course.bootcamp.id()).await;
    fetch(state, &course.id).await
}

pub async fn delete(state: &AppState, user: &User, raw_id: &str) -> Result<(), AppError> {
    authorize(user, PUBLISHERS)?;
    let course = fetch(state, raw_id).await?;
    ensure_owner(user, &course.user, "delete this course")?;

    if !state.repo.delete_course(&course.id).await? {
        return Err(not_found(&course.id));
    }
    tracing::info!("User {} deleted course {}", user.id, course.id);

    refresh_average_cost(state, course.bootcamp.id()).await;
    Ok(())
}

/// Recompute a bootcamp's average cost after a course write has committed.
///
/// Failures leave the previous value in place and are only logged.
pub async fn refresh_average_cost(state: &AppState, bootcamp_id: &str) {
    let result = async {
        let mean = state.repo.course_tuition_mean(bootcamp_id).await?;
        let cost = mean.map(average_cost);
        state.repo.set_average_cost(bootcamp_id, cost).await?;
        Ok::<_, AppError>(cost)
    }
    .await;

    match result {
        Ok(cost) => tracing::debug!("Bootcamp {} average cost is now {:?}", bootcamp_id, cost),
        Err(e) => tracing::warn!(
            "Failed to recompute average cost of bootcamp {}: {}",
            bootcamp_id,
            e
        ),
    }
}

/// Round a mean tuition up to the next multiple of ten.
pub fn average_cost(mean_tuition: f64) -> i64 {
    ((mean_tuition / 10.0).ceil() * 10.0) as i64
}

async fn fetch(state: &AppState, raw_id: &str) -> Result<Course, AppError> {
    let id = parse_id(raw_id)?;
    state.repo.get_course(&id).await?.ok_or_else(|| not_found(&id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Course not found with id of {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_cost_rounds_up_to_tens() {
        assert_eq!(average_cost(11500.0), 11500);
        assert_eq!(average_cost(11500.5), 11510);
        assert_eq!(average_cost(0.0), 0);
        assert_eq!(average_cost(1.0), 10);
    }

    #[test]
    fn test_average_cost_is_idempotent() {
        let once = average_cost(12345.0);
        assert_eq!(average_cost(once as f64), once);
    }
}
