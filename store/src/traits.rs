use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::UserRecord;

/// Everything the handshake pipeline and the admin CLI need from a
/// credential store. Kept as a trait so the pipeline can be driven by a
/// throwaway in-memory store in tests without pulling in sqlite.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up a user by username OR email, case-insensitively.
    /// `Err(StoreError::UnknownUser)` means the lookup simply missed;
    /// other errors mean the store itself failed.
    async fn find_user(&self, login: &str) -> Result<UserRecord, StoreError>;

    /// Computes a fresh salt/verifier for `password` and inserts a new
    /// user. Fails with `DuplicateUsername` if `username` is already
    /// taken.
    async fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), StoreError>;
}
