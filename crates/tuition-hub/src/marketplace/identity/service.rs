use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::marketplace::error::MarketplaceError;

use super::domain::{
    ChildInfo, Identity, Role, Session, SessionToken, UserId, UserRecord, UserView,
};
use super::repository::{SessionStore, UserRepository};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration payload. Role is fixed here and never changeable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub children: Vec<ChildInfo>,
}

/// Password change payload for `PUT /api/auth/password`.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Login/registration response: the session token plus the owner view.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub token: SessionToken,
    pub user: UserView,
}

/// Registration, login, and session resolution over the identity store.
pub struct IdentityService<U, S> {
    users: Arc<U>,
    sessions: Arc<S>,
    session_ttl: Duration,
}

impl<U, S> IdentityService<U, S>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    pub fn new(users: Arc<U>, sessions: Arc<S>, session_ttl_hours: i64) -> Self {
        Self {
            users,
            sessions,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    /// Create a user and open a session for it.
    pub fn register(&self, new_user: NewUser) -> Result<AuthenticatedUser, MarketplaceError> {
        let name = new_user.name.trim().to_string();
        if name.is_empty() {
            return Err(MarketplaceError::validation("name is required"));
        }
        let email = new_user.email.trim().to_ascii_lowercase();
        if !email.contains('@') {
            return Err(MarketplaceError::validation("email is not valid"));
        }
        if new_user.password.len() < MIN_PASSWORD_LENGTH {
            return Err(MarketplaceError::validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let record = UserRecord {
            id: UserId::generate(),
            name,
            email,
            password_hash: hash_password(&new_user.password)?,
            role: new_user.role,
            avatar: String::new(),
            bio: new_user.bio,
            location: new_user.location,
            phone: new_user.phone,
            children: new_user.children,
            permissions: Vec::new(),
            verified: false,
            created_at: Utc::now(),
        };

        let stored = self.users.insert(record).map_err(|error| match error {
            crate::marketplace::error::RepositoryError::Conflict => {
                MarketplaceError::conflict("an account with this email already exists")
            }
            other => other.into(),
        })?;

        info!(user = %stored.id, role = stored.role.label(), "registered user");
        let token = self.open_session(&stored)?;
        Ok(AuthenticatedUser {
            token,
            user: UserView::from(&stored),
        })
    }

    /// Verify a credential and open a session.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, MarketplaceError> {
        let email = email.trim().to_ascii_lowercase();
        let record = self
            .users
            .fetch_by_email(&email)?
            .ok_or(MarketplaceError::Unauthorized)?;

        if !verify_password(password, &record.password_hash)? {
            return Err(MarketplaceError::Unauthorized);
        }

        let token = self.open_session(&record)?;
        Ok(AuthenticatedUser {
            token,
            user: UserView::from(&record),
        })
    }

    /// Resolve a bearer token to the calling identity.
    pub fn authenticate(&self, token: &str) -> Result<Identity, MarketplaceError> {
        let token = SessionToken(token.to_string());
        let session = self
            .sessions
            .fetch(&token)?
            .ok_or(MarketplaceError::Unauthorized)?;

        if session.expires_at <= Utc::now() {
            self.sessions.remove(&token)?;
            return Err(MarketplaceError::Unauthorized);
        }

        let record = self
            .users
            .fetch(session.user_id)?
            .ok_or(MarketplaceError::Unauthorized)?;

        Ok(Identity {
            user_id: record.id,
            role: record.role,
        })
    }

    /// The authenticated caller's own record.
    pub fn me(&self, identity: Identity) -> Result<UserView, MarketplaceError> {
        let record = self
            .users
            .fetch(identity.user_id)?
            .ok_or(MarketplaceError::NotFound("user"))?;
        Ok(UserView::from(&record))
    }

    /// Rehash the credential; only reachable through an explicit change.
    pub fn change_password(
        &self,
        identity: Identity,
        change: PasswordChange,
    ) -> Result<(), MarketplaceError> {
        if change.new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(MarketplaceError::validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let mut record = self
            .users
            .fetch(identity.user_id)?
            .ok_or(MarketplaceError::NotFound("user"))?;

        if !verify_password(&change.current_password, &record.password_hash)? {
            return Err(MarketplaceError::Unauthorized);
        }

        record.password_hash = hash_password(&change.new_password)?;
        self.users.update(record)?;
        Ok(())
    }

    fn open_session(&self, record: &UserRecord) -> Result<SessionToken, MarketplaceError> {
        let token = SessionToken::generate();
        let session = Session {
            user_id: record.id,
            expires_at: Utc::now() + self.session_ttl,
        };
        self.sessions.insert(token.clone(), session)?;
        Ok(token)
    }
}

fn hash_password(password: &str) -> Result<String, MarketplaceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| MarketplaceError::Internal(format!("password hashing failed: {error}")))
}

fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, MarketplaceError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|error| MarketplaceError::Internal(format!("stored hash unreadable: {error}")))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}
