use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::marketplace::error::RepositoryError;
use crate::marketplace::identity::{Identity, Role, UserId, UserRecord, UserRepository};
use crate::marketplace::posts::domain::{
    Budget, Location, PostId, PostStatus, Priority, Requirements, Schedule, StudentInfo,
    SubjectEntry, SubjectLevel, TuitionPost,
};
use crate::marketplace::posts::repository::{PostRecord, PostRepository};
use crate::marketplace::posts::service::{NewTuitionPost, TuitionPostService};
use crate::realtime::{EventPublisher, MarketplaceEvent};

/// Versioned in-memory post store with optional injected write contention.
#[derive(Default)]
pub(super) struct MemoryPosts {
    records: Mutex<HashMap<PostId, PostRecord>>,
    contention: Mutex<u32>,
}

impl MemoryPosts {
    /// Fail the next `count` updates with `VersionMismatch`, as if another
    /// writer won the race each time.
    pub(super) fn inject_contention(&self, count: u32) {
        *self.contention.lock().expect("contention mutex poisoned") = count;
    }
}

impl PostRepository for MemoryPosts {
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
        {
            let mut contention = self.contention.lock().expect("contention mutex poisoned");
            if *contention > 0 {
                *contention -= 1;
                return Err(RepositoryError::VersionMismatch);
            }
        }

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

#[derive(Default)]
pub(super) struct MemoryUsers {
    records: Mutex<HashMap<UserId, UserRecord>>,
}

impl UserRepository for MemoryUsers {
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

#[derive(Default)]
pub(super) struct RecordedEvents {
    events: Mutex<Vec<MarketplaceEvent>>,
}

impl RecordedEvents {
    pub(super) fn events(&self) -> Vec<MarketplaceEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for RecordedEvents {
    fn publish(&self, event: MarketplaceEvent) {
        self.events.lock().expect("event mutex poisoned").push(event);
    }
}

pub(super) type PostServiceUnderTest = TuitionPostService<MemoryPosts, MemoryUsers, RecordedEvents>;

pub(super) fn build_service() -> (
    PostServiceUnderTest,
    Arc<MemoryPosts>,
    Arc<MemoryUsers>,
    Arc<RecordedEvents>,
) {
    let posts = Arc::new(MemoryPosts::default());
    let users = Arc::new(MemoryUsers::default());
    let events = Arc::new(RecordedEvents::default());
    let service = TuitionPostService::new(posts.clone(), users.clone(), events.clone(), 30);
    (service, posts, users, events)
}

/// Insert a user with the given role and return their identity.
pub(super) fn seeded_identity(users: &MemoryUsers, name: &str, role: Role) -> Identity {
    let id = UserId::generate();
    let record = UserRecord {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password_hash: "unused".to_string(),
        role,
        avatar: String::new(),
        bio: String::new(),
        location: "Dhaka".to_string(),
        phone: String::new(),
        children: Vec::new(),
        permissions: Vec::new(),
        verified: true,
        created_at: Utc::now(),
    };
    users.insert(record).expect("seed user");
    Identity { user_id: id, role }
}

pub(super) fn new_post(title: &str) -> NewTuitionPost {
    NewTuitionPost {
        title: title.to_string(),
        description: "Looking for a patient tutor twice a week.".to_string(),
        subjects: vec![SubjectEntry {
            name: "Mathematics".to_string(),
            level: SubjectLevel::High,
        }],
        student_info: StudentInfo::default(),
        requirements: Requirements::default(),
        schedule: Schedule::default(),
        budget: Budget {
            min: 20,
            max: 40,
            currency: "USD".to_string(),
        },
        location: Location {
            city: Some("Chittagong".to_string()),
            ..Location::default()
        },
        tags: Vec::new(),
        priority: Priority::Medium,
        expires_at: None,
    }
}

/// Bare aggregate for exercising the lifecycle functions directly.
pub(super) fn bare_post(guardian: UserId) -> TuitionPost {
    let now = Utc::now();
    TuitionPost {
        id: PostId::generate(),
        guardian,
        title: "Physics tutor needed".to_string(),
        description: "Twice a week, exam preparation.".to_string(),
        subjects: vec![SubjectEntry {
            name: "Physics".to_string(),
            level: SubjectLevel::College,
        }],
        student_info: StudentInfo::default(),
        requirements: Requirements::default(),
        schedule: Schedule::default(),
        budget: Budget {
            min: 15,
            max: 30,
            currency: "USD".to_string(),
        },
        location: Location::default(),
        status: PostStatus::Active,
        applications: Vec::new(),
        selected_tutor: None,
        tags: Vec::new(),
        priority: Priority::Medium,
        expires_at: now + Duration::days(30),
        created_at: now,
        updated_at: now,
    }
}
