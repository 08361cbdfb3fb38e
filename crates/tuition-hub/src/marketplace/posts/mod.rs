//! Tuition posts and the application lifecycle engine.
//!
//! A `TuitionPost` exclusively owns its embedded applications: they have no
//! identity or mutation path outside the parent aggregate. All state
//! transitions go through `lifecycle`, and the service applies them under a
//! per-post optimistic-concurrency loop so "at most one accepted application
//! per post" holds even for concurrent accepts.

pub mod domain;
pub mod filter;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationView, Budget, CvAttachment,
    GenderPreference, Location, PostId, PostStatus, Priority, Requirements, Schedule, StudentInfo,
    SubjectEntry, SubjectLevel, TeachingMode, TuitionPost, TuitionPostView,
};
pub use filter::{PostPage, PostQuery};
pub use lifecycle::{ApplicationDecision, LifecycleError};
pub use repository::{PostRecord, PostRepository};
pub use router::post_router;
pub use service::{
    ApplicationRequest, MyApplicationView, NewTuitionPost, TuitionPostService, UpdateTuitionPost,
};
