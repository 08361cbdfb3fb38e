use crate::marketplace::error::RepositoryError;
use crate::marketplace::identity::UserId;

use super::domain::{TutorProfile, TutorProfileId};

/// Storage abstraction for tutor profiles. `insert` must reject a second
/// profile for the same user with `Conflict`.
pub trait TutorRepository: Send + Sync {
    fn insert(&self, profile: TutorProfile) -> Result<TutorProfile, RepositoryError>;
    fn update(&self, profile: TutorProfile) -> Result<(), RepositoryError>;
    fn fetch(&self, id: TutorProfileId) -> Result<Option<TutorProfile>, RepositoryError>;
    fn fetch_by_user(&self, user: UserId) -> Result<Option<TutorProfile>, RepositoryError>;
    fn list(&self) -> Result<Vec<TutorProfile>, RepositoryError>;
}
