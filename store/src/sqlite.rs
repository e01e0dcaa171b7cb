use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;
use crate::model::{AccessLevel, UserRecord};
use crate::traits::CredentialStore;

/// Credential store backed by sqlite, reachable through the single
/// `database.filename` configuration key. `":memory:"` gets a pool pinned
/// to one connection so the in-memory database isn't silently dropped and
/// recreated between queries.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(filename: &str) -> Result<Self, StoreError> {
        let pool = if filename == ":memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            SqlitePoolOptions::new()
                .connect_with(
                    SqliteConnectOptions::from_str(filename)?
                        .create_if_missing(true),
                )
                .await?
        };

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                verifier BLOB NOT NULL,
                salt BLOB NOT NULL,
                access TEXT NOT NULL DEFAULT 'USER',
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_user(&self, login: &str) -> Result<UserRecord, StoreError> {
        let row = sqlx::query(
            "SELECT username, email, verifier, salt, access
             FROM users
             WHERE active = 1 AND (LOWER(username) = LOWER(?1) OR LOWER(email) = LOWER(?1))",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::UnknownUser)?;
        let access: String = row.try_get("access")?;
        Ok(UserRecord {
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            verifier: row.try_get("verifier")?,
            salt: row.try_get("salt")?,
            access_level: AccessLevel::from_str(&access).unwrap_or(AccessLevel::User),
        })
    }

    async fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), StoreError> {
        let (salt, verifier) = authd_srp::compute_verifier(username, password);

        let result = sqlx::query(
            "INSERT INTO users (username, email, verifier, salt, access) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(&verifier)
        .bind(&salt)
        .bind(AccessLevel::User.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateUsername(username.to_string()))
            }
            Err(other) => Err(StoreError::Io(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_find_by_username_and_email() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        store
            .add_user("Alice", "alice@example.com", "hunter2")
            .await
            .unwrap();

        let by_username = store.find_user("alice").await.unwrap();
        assert_eq!(by_username.username, "Alice");

        let by_email = store.find_user("ALICE@EXAMPLE.COM").await.unwrap();
        assert_eq!(by_email.username, "Alice");
    }

    #[tokio::test]
    async fn unknown_login_is_unknown_user() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        let err = store.find_user("nobody").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        store.add_user("bob", "bob@example.com", "pw").await.unwrap();
        let err = store
            .add_user("bob", "bob2@example.com", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));
    }
}
