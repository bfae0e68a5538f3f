//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, bootcamps and courses.

mod bootcamps;
mod courses;
mod repository;

pub use bootcamps::BOOTCAMP_SCHEMA;
pub use courses::COURSE_SCHEMA;
pub use repository::*;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Current time as stored in `created_at` columns.
///
/// Fixed-width UTC with milliseconds, so text order is time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            reset_token_digest TEXT,
            reset_token_expire TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bootcamps (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL,
            description TEXT NOT NULL,
            website TEXT,
            phone TEXT,
            email TEXT,
            lng REAL,
            lat REAL,
            formatted_address TEXT,
            street TEXT,
            city TEXT,
            state TEXT,
            zipcode TEXT,
            country TEXT,
            careers TEXT NOT NULL DEFAULT '[]',
            average_rating REAL,
            average_cost INTEGER,
            photo TEXT NOT NULL DEFAULT 'no-photo.jpg',
            housing INTEGER NOT NULL DEFAULT 0,
            job_assistance INTEGER NOT NULL DEFAULT 0,
            job_guarantee INTEGER NOT NULL DEFAULT 0,
            accept_gi INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            bootcamp_id TEXT NOT NULL REFERENCES bootcamps(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            weeks INTEGER NOT NULL,
            tuition INTEGER NOT NULL,
            minimum_skill TEXT NOT NULL,
            scholarship_available INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_bootcamps_user ON bootcamps(user_id);
        CREATE INDEX IF NOT EXISTS idx_bootcamps_lat ON bootcamps(lat);
        CREATE INDEX IF NOT EXISTS idx_bootcamps_created_at ON bootcamps(created_at);
        CREATE INDEX IF NOT EXISTS idx_courses_bootcamp ON courses(bootcamp_id);
        CREATE INDEX IF NOT EXISTS idx_courses_created_at ON courses(created_at);
        CREATE INDEX IF NOT EXISTS idx_users_reset_token ON users(reset_token_digest);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_as_text() {
        let first = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = now_timestamp();
        assert!(first < second);
        assert!(first.ends_with('Z'));
        assert_eq!(first.len(), "2024-01-01T00:00:00.000Z".len());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.sqlite");
        let pool = init_database(&path).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["bootcamps", "courses", "users"]);
    }
}
