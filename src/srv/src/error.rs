//! Failure kinds shared by every store operation

use thiserror::Error;

/// Error produced by [`UserDirectory`](crate::UserDirectory) and
/// [`SkillCatalog`](crate::SkillCatalog) operations.
///
/// Absence is never an error: lookups return [`None`] instead. The same goes
/// for credential mismatches on the authenticating lookups, so a caller can
/// never tell an unknown email from a wrong password.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another user already holds this email address.
    #[error("email is already in use")]
    DuplicateEmail,

    /// Another skill already holds this name.
    #[error("skill name is already in use")]
    DuplicateSkillName,

    /// A referenced user, skill, or manager does not exist, or the manager
    /// reference would point a user at themselves or close a cycle.
    #[error("invalid user, skill, or manager reference")]
    ForeignKeyViolation,

    /// The supplied current password does not match the stored credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credential derivation or verification failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// The storage engine reported a fault unrelated to the constraints
    /// above.
    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

/// Map an engine error at a call site where a unique-constraint breach has
/// the domain meaning `duplicate`. Foreign-key breaches keep their own kind.
pub(crate) fn unique(err: sqlx::Error, duplicate: StoreError) -> StoreError {
    match kind(&err) {
        Some(sqlx::error::ErrorKind::UniqueViolation) => duplicate,
        Some(sqlx::error::ErrorKind::ForeignKeyViolation) => StoreError::ForeignKeyViolation,
        _ => StoreError::Storage(err),
    }
}

/// Map an engine error where only foreign-key breaches carry domain meaning.
pub(crate) fn reference(err: sqlx::Error) -> StoreError {
    match kind(&err) {
        Some(sqlx::error::ErrorKind::ForeignKeyViolation) => StoreError::ForeignKeyViolation,
        _ => StoreError::Storage(err),
    }
}

fn kind(err: &sqlx::Error) -> Option<sqlx::error::ErrorKind> {
    match err {
        sqlx::Error::Database(db) => Some(db.kind()),
        _ => None,
    }
}
