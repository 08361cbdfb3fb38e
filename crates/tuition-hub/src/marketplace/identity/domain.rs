use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed role enumeration; assigned at registration and never changed by
/// the user. Authorization is a capability check against this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
    Guardian,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Guardian => "guardian",
            Role::Admin => "admin",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Guardians author tuition posts; admins may act on their behalf.
    pub const fn can_create_posts(self) -> bool {
        matches!(self, Role::Guardian | Role::Admin)
    }

    /// Only tutors submit applications to tuition posts.
    pub const fn can_apply(self) -> bool {
        matches!(self, Role::Tutor)
    }

    /// Only tutors own a tutor profile.
    pub const fn can_offer_tutoring(self) -> bool {
        matches!(self, Role::Tutor)
    }
}

/// Guardian-only child descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// Admin-only permission grants; stored, not yet consulted per-route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    ManageUsers,
    ManagePosts,
    ManageApplications,
    ViewAnalytics,
}

/// Stored identity record. Never hard-deleted; the credential hash is
/// rewritten only when the password changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub phone: String,
    pub children: Vec<ChildInfo>,
    pub permissions: Vec<AdminPermission>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Opaque bearer token identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// Server-side session state behind a bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller, resolved from a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

/// Full user view returned to the owning caller. Credential hash excluded.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub phone: String,
    pub children: Vec<ChildInfo>,
    pub permissions: Vec<AdminPermission>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserView {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            role: record.role,
            avatar: record.avatar.clone(),
            bio: record.bio.clone(),
            location: record.location.clone(),
            phone: record.phone.clone(),
            children: record.children.clone(),
            permissions: record.permissions.clone(),
            verified: record.verified,
            created_at: record.created_at,
        }
    }
}

/// Trimmed reference view used when resolving guardian/tutor references on
/// posts and profiles for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub location: String,
    pub phone: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            avatar: record.avatar.clone(),
            location: record.location.clone(),
            phone: record.phone.clone(),
        }
    }
}
