use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use tuition_hub::marketplace::identity::{
    Session, SessionStore, SessionToken, UserId, UserRecord, UserRepository,
};
use tuition_hub::marketplace::posts::{PostId, PostRecord, PostRepository, TuitionPost};
use tuition_hub::marketplace::tutors::{TutorProfile, TutorProfileId, TutorRepository};
use tuition_hub::marketplace::RepositoryError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    records: Arc<Mutex<HashMap<UserId, UserRecord>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.values().any(|user| user.email == record.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, record: UserRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id, record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionToken, Session>>>,
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, token: SessionToken, session: Session) -> Result<(), RepositoryError> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token, session);
        Ok(())
    }

    fn fetch(&self, token: &SessionToken) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .expect("session mutex poisoned")
            .get(token)
            .cloned())
    }

    fn remove(&self, token: &SessionToken) -> Result<(), RepositoryError> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(token);
        Ok(())
    }
}

/// Versioned post store. `update` is a check-and-swap on the record version,
/// so two concurrent read-modify-write cycles cannot both land.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPostRepository {
    records: Arc<Mutex<HashMap<PostId, PostRecord>>>,
}

impl PostRepository for InMemoryPostRepository {
    fn insert(&self, post: TuitionPost) -> Result<PostRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("post mutex poisoned");
        if guard.contains_key(&post.id) {
            return Err(RepositoryError::Conflict);
        }
        let record = PostRecord { post, version: 1 };
        guard.insert(record.post.id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: PostId) -> Result<Option<PostRecord>, RepositoryError> {
        let guard = self.records.lock().expect("post mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update(&self, record: PostRecord) -> Result<PostRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("post mutex poisoned");
        let stored = guard
            .get_mut(&record.post.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::VersionMismatch);
        }
        stored.post = record.post;
        stored.version += 1;
        Ok(stored.clone())
    }

    fn list(&self) -> Result<Vec<TuitionPost>, RepositoryError> {
        let guard = self.records.lock().expect("post mutex poisoned");
        Ok(guard.values().map(|record| record.post.clone()).collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTutorRepository {
    records: Arc<Mutex<HashMap<TutorProfileId, TutorProfile>>>,
}

impl TutorRepository for InMemoryTutorRepository {
    fn insert(&self, profile: TutorProfile) -> Result<TutorProfile, RepositoryError> {
        let mut guard = self.records.lock().expect("tutor mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.user == profile.user)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn update(&self, profile: TutorProfile) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("tutor mutex poisoned");
        if guard.contains_key(&profile.id) {
            guard.insert(profile.id, profile);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: TutorProfileId) -> Result<Option<TutorProfile>, RepositoryError> {
        let guard = self.records.lock().expect("tutor mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn fetch_by_user(&self, user: UserId) -> Result<Option<TutorProfile>, RepositoryError> {
        let guard = self.records.lock().expect("tutor mutex poisoned");
        Ok(guard
            .values()
            .find(|profile| profile.user == user)
            .cloned())
    }

    fn list(&self) -> Result<Vec<TutorProfile>, RepositoryError> {
        let guard = self.records.lock().expect("tutor mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}
