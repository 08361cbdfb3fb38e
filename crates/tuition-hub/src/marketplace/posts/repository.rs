use crate::marketplace::error::RepositoryError;

use super::domain::{PostId, TuitionPost};

/// A post plus its optimistic-concurrency token.
///
/// `version` reflects the stored document generation at fetch time; `update`
/// must refuse a record whose version no longer matches storage with
/// `VersionMismatch`, which is what serializes concurrent read-modify-write
/// cycles on the same post.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: TuitionPost,
    pub version: u64,
}

/// Storage abstraction for the tuition post store.
pub trait PostRepository: Send + Sync {
    fn insert(&self, post: TuitionPost) -> Result<PostRecord, RepositoryError>;
    fn fetch(&self, id: PostId) -> Result<Option<PostRecord>, RepositoryError>;
    /// Check-and-swap on `record.version`; the stored version advances by one.
    fn update(&self, record: PostRecord) -> Result<PostRecord, RepositoryError>;
    fn list(&self) -> Result<Vec<TuitionPost>, RepositoryError>;
}
