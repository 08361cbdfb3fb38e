use crate::marketplace::error::RepositoryError;

use super::domain::{Session, SessionToken, UserId, UserRecord};

/// Storage abstraction for identity records so the service can be exercised
/// in isolation. `insert` must reject a duplicate email with `Conflict`.
pub trait UserRepository: Send + Sync {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, RepositoryError>;
    fn update(&self, record: UserRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
}

/// Session handle storage behind opaque bearer tokens.
pub trait SessionStore: Send + Sync {
    fn insert(&self, token: SessionToken, session: Session) -> Result<(), RepositoryError>;
    fn fetch(&self, token: &SessionToken) -> Result<Option<Session>, RepositoryError>;
    fn remove(&self, token: &SessionToken) -> Result<(), RepositoryError>;
}
