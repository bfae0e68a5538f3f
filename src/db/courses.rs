//! Course persistence.

use std::collections::HashMap;

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{
    new_id, BootcampRef, BootcampSummary, Course, MinimumSkill, NewCourse,
};
use crate::query::{FieldKind, FieldSpec, ListQuery, ResourceSchema};

const COURSE_COLUMNS: &str = "id, bootcamp_id, user_id, title, description, weeks, tuition, \
    minimum_skill, scholarship_available, created_at";

/// Course columns joined with the parent summary.
const POPULATED_COLUMNS: &str = "courses.id AS id, courses.bootcamp_id AS bootcamp_id, \
    courses.user_id AS user_id, courses.title AS title, courses.description AS description, \
    courses.weeks AS weeks, courses.tuition AS tuition, courses.minimum_skill AS minimum_skill, \
    courses.scholarship_available AS scholarship_available, courses.created_at AS created_at, \
    bootcamps.name AS bootcamp_name, bootcamps.description AS bootcamp_description";

const POPULATED_FROM: &str = "FROM courses JOIN bootcamps ON bootcamps.id = courses.bootcamp_id";

/// Fields of a course that list requests may filter and sort on.
pub static COURSE_SCHEMA: ResourceSchema = ResourceSchema {
    table: "courses",
    fields: &[
        FieldSpec { name: "title", column: "title", kind: FieldKind::Text },
        FieldSpec { name: "description", column: "description", kind: FieldKind::Text },
        FieldSpec { name: "weeks", column: "weeks", kind: FieldKind::Number },
        FieldSpec { name: "tuition", column: "tuition", kind: FieldKind::Number },
        FieldSpec { name: "minimumSkill", column: "minimum_skill", kind: FieldKind::Text },
        FieldSpec {
            name: "scholarshipAvailable",
            column: "scholarship_available",
            kind: FieldKind::Bool,
        },
        FieldSpec { name: "bootcamp", column: "bootcamp_id", kind: FieldKind::Text },
        FieldSpec { name: "user", column: "user_id", kind: FieldKind::Text },
        FieldSpec { name: "createdAt", column: "created_at", kind: FieldKind::Timestamp },
    ],
    default_sort: "createdAt",
};

impl Repository {
    // ==================== COURSE OPERATIONS ====================

    /// Insert a course. The returned course references its parent by id.
    pub async fn insert_course(&self, course: &NewCourse) -> Result<Course, AppError> {
        let id = new_id();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO courses (id, bootcamp_id, user_id, title, description, weeks, tuition, \
             minimum_skill, scholarship_available, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&course.bootcamp_id)
        .bind(&course.user)
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_str())
        .bind(course.scholarship_available as i32)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Course {
            id,
            title: course.title.clone(),
            description: course.description.clone(),
            weeks: course.weeks,
            tuition: course.tuition,
            minimum_skill: course.minimum_skill,
            scholarship_available: course.scholarship_available,
            bootcamp: BootcampRef::Id(course.bootcamp_id.clone()),
            user: course.user.clone(),
            created_at: now,
        })
    }

    /// Get a course by ID with its parent summary populated.
    pub async fn get_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {POPULATED_COLUMNS} {POPULATED_FROM} WHERE courses.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(populated_course_from_row))
    }

    /// One page of courses matching `query`, plus the total number of matches.
    pub async fn list_courses(&self, query: &ListQuery) -> Result<(Vec<Course>, i64), AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM courses");
        query.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {POPULATED_COLUMNS} {POPULATED_FROM}"));
        query.push_where(&mut select);
        query.push_order_and_window(&mut select);
        let rows = select.build().fetch_all(&self.pool).await?;

        Ok((rows.iter().map(populated_course_from_row).collect(), total))
    }

    /// All courses of one bootcamp, oldest first, with the parent populated.
    pub async fn list_courses_for_bootcamp(
        &self,
        bootcamp_id: &str,
    ) -> Result<Vec<Course>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {POPULATED_COLUMNS} {POPULATED_FROM} \
             WHERE courses.bootcamp_id = ? ORDER BY courses.created_at, courses.rowid"
        ))
        .bind(bootcamp_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(populated_course_from_row).collect())
    }

    /// Courses of several bootcamps, grouped by bootcamp id.
    pub async fn courses_for_bootcamps(
        &self,
        bootcamp_ids: &[String],
    ) -> Result<HashMap<String, Vec<Course>>, AppError> {
        let mut grouped: HashMap<String, Vec<Course>> = HashMap::new();
        if bootcamp_ids.is_empty() {
            return Ok(grouped);
        }

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE bootcamp_id IN ("
        ));
        let mut ids = select.separated(", ");
        for id in bootcamp_ids {
            ids.push_bind(id.clone());
        }
        select.push(") ORDER BY created_at, rowid");

        let rows = select.build().fetch_all(&self.pool).await?;
        for row in &rows {
            let course = course_from_row(row);
            grouped
                .entry(course.bootcamp.id().to_string())
                .or_default()
                .push(course);
        }

        Ok(grouped)
    }

    /// Write back every client-mutable field of a merged course.
    pub async fn update_course(&self, course: &Course) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE courses SET title = ?, description = ?, weeks = ?, tuition = ?, \
             minimum_skill = ?, scholarship_available = ? WHERE id = ?",
        )
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_str())
        .bind(course.scholarship_available as i32)
        .bind(&course.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a course. Returns `false` if it did not exist.
    pub async fn delete_course(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mean tuition of a bootcamp's courses, `None` when it has none.
    pub async fn course_tuition_mean(&self, bootcamp_id: &str) -> Result<Option<f64>, AppError> {
        let mean: Option<f64> =
            sqlx::query_scalar("SELECT AVG(tuition) FROM courses WHERE bootcamp_id = ?")
                .bind(bootcamp_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(mean)
    }
}

// ==================== ROW CONVERSION HELPERS ====================

fn course_from_row(row: &SqliteRow) -> Course {
    course_with_parent(row, BootcampRef::Id(row.get("bootcamp_id")))
}

fn populated_course_from_row(row: &SqliteRow) -> Course {
    let parent = BootcampRef::Summary(BootcampSummary {
        id: row.get("bootcamp_id"),
        name: row.get("bootcamp_name"),
        description: row.get("bootcamp_description"),
    });
    course_with_parent(row, parent)
}

fn course_with_parent(row: &SqliteRow, bootcamp: BootcampRef) -> Course {
    let minimum_skill: String = row.get("minimum_skill");
    Course {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        weeks: row.get("weeks"),
        tuition: row.get("tuition"),
        minimum_skill: MinimumSkill::from_str(&minimum_skill).unwrap_or(MinimumSkill::Beginner),
        scholarship_available: row.get::<i32, _>("scholarship_available") != 0,
        bootcamp,
        user: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}
