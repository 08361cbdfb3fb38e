//! State transitions for a tuition post and its embedded applications.
//!
//! Every function here mutates a single in-memory `TuitionPost` aggregate and
//! leaves persistence to the caller, so the whole transition is written back
//! as one unit. Post expiry is enforced lazily: an `Active` post whose
//! `expires_at` has passed behaves as `Expired` for every operation and read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::identity::UserId;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, CvAttachment, PostStatus, TuitionPost,
};

/// Transition failures; mapped onto the marketplace taxonomy by the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("this tuition post is no longer active")]
    PostNotActive,
    #[error("you have already applied for this position")]
    AlreadyApplied,
    #[error("application not found")]
    ApplicationNotFound,
    #[error("application has already been resolved")]
    AlreadyResolved,
    #[error("another application has already been accepted")]
    PostAlreadyFilled,
}

/// Explicit guardian/admin decision on an application. Withdrawal is a
/// separate tutor-initiated operation, not a decision value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationDecision {
    Accepted,
    Rejected,
}

/// Tutor-supplied application content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationDetails {
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub proposed_rate: u32,
    #[serde(default)]
    pub cv: Option<CvAttachment>,
}

/// The status a post reports at `now`, accounting for lazy expiry.
pub fn effective_status(post: &TuitionPost, now: DateTime<Utc>) -> PostStatus {
    if post.status == PostStatus::Active && post.expires_at <= now {
        PostStatus::Expired
    } else {
        post.status
    }
}

/// Append a pending application for `tutor`.
///
/// The uniqueness check spans every prior application by this tutor,
/// regardless of its status: a rejected or withdrawn tutor cannot re-apply.
pub fn submit_application(
    post: &mut TuitionPost,
    tutor: UserId,
    details: ApplicationDetails,
    now: DateTime<Utc>,
) -> Result<ApplicationId, LifecycleError> {
    if effective_status(post, now) != PostStatus::Active {
        return Err(LifecycleError::PostNotActive);
    }
    if post.application_by_tutor(tutor).is_some() {
        return Err(LifecycleError::AlreadyApplied);
    }

    let application = Application {
        id: ApplicationId::generate(),
        tutor,
        applied_at: now,
        status: ApplicationStatus::Pending,
        cover_letter: details.cover_letter,
        proposed_rate: details.proposed_rate,
        cv: details.cv,
    };
    let id = application.id;
    post.applications.push(application);
    post.updated_at = now;
    Ok(id)
}

/// Apply a guardian/admin decision to one application.
///
/// Accepting sets the post's selected tutor, marks it filled, and sweeps
/// every *other* pending sibling to rejected in the same mutation.
/// Re-applying a decision an application already carries is an idempotent
/// no-op; any other transition out of a terminal state is refused.
pub fn resolve_application(
    post: &mut TuitionPost,
    application_id: ApplicationId,
    decision: ApplicationDecision,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let target = post
        .applications
        .iter()
        .position(|app| app.id == application_id)
        .ok_or(LifecycleError::ApplicationNotFound)?;
    let current = post.applications[target].status;

    match decision {
        ApplicationDecision::Accepted => {
            if current == ApplicationStatus::Accepted {
                return Ok(());
            }
            if post.status == PostStatus::Filled {
                return Err(LifecycleError::PostAlreadyFilled);
            }
            if current.is_terminal() {
                return Err(LifecycleError::AlreadyResolved);
            }

            let tutor = post.applications[target].tutor;
            post.applications[target].status = ApplicationStatus::Accepted;
            post.selected_tutor = Some(tutor);
            post.status = PostStatus::Filled;
            for application in &mut post.applications {
                if application.id != application_id
                    && application.status == ApplicationStatus::Pending
                {
                    application.status = ApplicationStatus::Rejected;
                }
            }
        }
        ApplicationDecision::Rejected => {
            if current == ApplicationStatus::Rejected {
                return Ok(());
            }
            if current.is_terminal() {
                return Err(LifecycleError::AlreadyResolved);
            }
            post.applications[target].status = ApplicationStatus::Rejected;
        }
    }

    post.updated_at = now;
    Ok(())
}

/// Withdraw the caller's own pending application.
pub fn withdraw_application(
    post: &mut TuitionPost,
    tutor: UserId,
    now: DateTime<Utc>,
) -> Result<ApplicationId, LifecycleError> {
    let application = post
        .applications
        .iter_mut()
        .find(|app| app.tutor == tutor)
        .ok_or(LifecycleError::ApplicationNotFound)?;

    if application.status.is_terminal() {
        return Err(LifecycleError::AlreadyResolved);
    }

    application.status = ApplicationStatus::Withdrawn;
    let id = application.id;
    post.updated_at = now;
    Ok(id)
}
