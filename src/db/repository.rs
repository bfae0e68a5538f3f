//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Bootcamp and
//! course operations live in sibling modules as further `impl Repository` blocks.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::now_timestamp;
use crate::errors::AppError;
use crate::models::{new_id, NewUser, Role, User};

const USER_COLUMNS: &str = "id, name, email, role, password_hash, created_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Insert a user whose password is already hashed.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let id = new_id();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: now,
            password_hash: user.password_hash.clone(),
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by (normalized) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Store the digest of a freshly issued reset token.
    pub async fn set_reset_token(
        &self,
        user_id: &str,
        digest: &str,
        expires_at: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET reset_token_digest = ?, reset_token_expire = ? WHERE id = ?")
            .bind(digest)
            .bind(expires_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET reset_token_digest = NULL, reset_token_expire = NULL WHERE id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find the user holding an unexpired reset token with this digest.
    pub async fn find_user_by_reset_digest(
        &self,
        digest: &str,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_token_digest = ? AND reset_token_expire > ?"
        ))
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Set a new password and clear the reset token in one statement.
    ///
    /// Returns the user id, or `None` when the token was unknown, expired or already used.
    pub async fn consume_reset_token(
        &self,
        digest: &str,
        now: &str,
        password_hash: &str,
    ) -> Result<Option<String>, AppError> {
        let row = sqlx::query(
            "UPDATE users SET password_hash = ?, reset_token_digest = NULL, reset_token_expire = NULL \
             WHERE reset_token_digest = ? AND reset_token_expire > ? RETURNING id",
        )
        .bind(password_hash)
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("id")))
    }
}

// ==================== ROW CONVERSION HELPERS ====================

fn user_from_row(row: &SqliteRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: Role::from_str(&role).unwrap_or_default(),
        created_at: row.get("created_at"),
        password_hash: row.get("password_hash"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::init_database;

    pub(crate) async fn test_repo() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("test.sqlite")).await.unwrap();
        (Repository::new(pool), dir)
    }

    pub(crate) async fn insert_user(repo: &Repository, name: &str, role: Role) -> User {
        repo.create_user(&NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            password_hash: "$2b$04$notarealhash".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (repo, _dir) = test_repo().await;
        let user = insert_user(&repo, "Jane", Role::Publisher).await;

        let by_id = repo.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "jane@example.com");
        assert_eq!(by_id.role, Role::Publisher);

        let by_email = repo.find_user_by_email("jane@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
        assert!(repo.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_duplicate_key() {
        let (repo, _dir) = test_repo().await;
        insert_user(&repo, "Jane", Role::User).await;

        let result = repo
            .create_user(&NewUser {
                name: "Other".into(),
                email: "jane@example.com".into(),
                role: Role::User,
                password_hash: "x".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let (repo, _dir) = test_repo().await;
        let user = insert_user(&repo, "Jane", Role::User).await;
        repo.set_reset_token(&user.id, "digest", "2999-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let now = now_timestamp();
        let found = repo.find_user_by_reset_digest("digest", &now).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id.clone()));

        let consumed = repo.consume_reset_token("digest", &now, "newhash").await.unwrap();
        assert_eq!(consumed, Some(user.id.clone()));
        assert_eq!(
            repo.consume_reset_token("digest", &now, "again").await.unwrap(),
            None
        );
        assert_eq!(
            repo.get_user(&user.id).await.unwrap().unwrap().password_hash,
            "newhash"
        );
    }

    #[tokio::test]
    async fn test_expired_reset_token_not_found() {
        let (repo, _dir) = test_repo().await;
        let user = insert_user(&repo, "Jane", Role::User).await;
        repo.set_reset_token(&user.id, "digest", "2000-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let now = now_timestamp();
        assert!(repo.find_user_by_reset_digest("digest", &now).await.unwrap().is_none());
        assert!(repo.consume_reset_token("digest", &now, "x").await.unwrap().is_none());
    }
}
