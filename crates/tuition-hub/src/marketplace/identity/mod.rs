//! User identity: registration, login, sessions, and role capabilities.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AdminPermission, ChildInfo, Identity, Role, Session, SessionToken, UserId, UserRecord,
    UserSummary, UserView,
};
pub use repository::{SessionStore, UserRepository};
pub use router::{bearer_token, identity_router};
pub use service::{AuthenticatedUser, IdentityService, NewUser, PasswordChange};
