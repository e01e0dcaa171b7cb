use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no user matches that username or email")]
    UnknownUser,

    #[error("username {0:?} is already taken")]
    DuplicateUsername(String),

    #[error("credential store I/O error: {0}")]
    Io(#[from] sqlx::Error),
}
