//! Course model and request bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimum skill level a course expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

impl MinimumSkill {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinimumSkill::Beginner => "beginner",
            MinimumSkill::Intermediate => "intermediate",
            MinimumSkill::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(MinimumSkill::Beginner),
            "intermediate" => Some(MinimumSkill::Intermediate),
            "advanced" => Some(MinimumSkill::Advanced),
            _ => None,
        }
    }
}

/// The parent bootcamp as embedded in a course: a bare id, or a populated summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum BootcampRef {
    Id(String),
    Summary(BootcampSummary),
}

impl BootcampRef {
    pub fn id(&self) -> &str {
        match self {
            BootcampRef::Id(id) => id,
            BootcampRef::Summary(summary) => &summary.id,
        }
    }
}

/// Fields of a bootcamp shown alongside its courses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BootcampSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A course offered by a bootcamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub weeks: i64,
    pub tuition: i64,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
    pub bootcamp: BootcampRef,
    /// Owning user id; always the parent bootcamp's owner
    pub user: String,
    pub created_at: String,
}

/// A validated course ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub bootcamp_id: String,
    /// Owner of the parent bootcamp
    pub user: String,
    pub title: String,
    pub description: String,
    pub weeks: i64,
    pub tuition: i64,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
}

/// Request body for creating a course.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a course title"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a description of course"))]
    pub description: String,
    #[serde(default)]
    #[validate(
        required(message = "Please add a number of weeks"),
        range(min = 1, message = "Number of weeks must be at least 1")
    )]
    pub weeks: Option<i64>,
    #[serde(default)]
    #[validate(
        required(message = "Please add a tuition fee"),
        range(min = 0, message = "Tuition can not be negative")
    )]
    pub tuition: Option<i64>,
    #[serde(default)]
    #[validate(required(message = "Please add a minimum skill"))]
    pub minimum_skill: Option<MinimumSkill>,
    #[serde(default)]
    pub scholarship_available: bool,
    /// Parent bootcamp, when not given in the path
    #[serde(default)]
    pub bootcamp: Option<String>,
}

impl CreateCourseRequest {
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
    }
}

/// Partial update of a course. Parent bootcamp and owner are fixed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a course title"))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a description of course"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Number of weeks must be at least 1"))]
    pub weeks: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Tuition can not be negative"))]
    pub tuition: Option<i64>,
    #[serde(default)]
    pub minimum_skill: Option<MinimumSkill>,
    #[serde(default)]
    pub scholarship_available: Option<bool>,
}

impl UpdateCourseRequest {
    pub fn normalize(&mut self) {
        if let Some(title) = self.title.as_mut() {
            *title = title.trim().to_string();
        }
    }
}
