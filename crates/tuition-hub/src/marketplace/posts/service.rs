use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::marketplace::error::{MarketplaceError, RepositoryError};
use crate::marketplace::identity::{Identity, UserId, UserRepository, UserSummary};
use crate::realtime::{EventPublisher, MarketplaceEvent};

use super::domain::{
    ApplicationId, ApplicationView, Budget, Location, PostId, PostStatus, Priority, Requirements,
    Schedule, StudentInfo, SubjectEntry, TuitionPost, TuitionPostView,
};
use super::filter::{paginate, total_pages, PostPage, PostQuery};
use super::lifecycle::{self, ApplicationDecision, LifecycleError};
use super::repository::PostRepository;

pub use super::lifecycle::ApplicationDetails as ApplicationRequest;

/// Bounded optimistic-concurrency retries before a write is reported as
/// contended. The loop is the only place the engine ever re-runs a write.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Guardian-authored post content at creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTuitionPost {
    pub title: String,
    pub description: String,
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub student_info: StudentInfo,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub schedule: Schedule,
    pub budget: Budget,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Editable subset for `PUT /api/tuition-posts/{id}`. The guardian
/// reference, applications, and selected tutor are never client-assignable;
/// `status` may only move between `active` and `cancelled` here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTuitionPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subjects: Option<Vec<SubjectEntry>>,
    #[serde(default)]
    pub student_info: Option<StudentInfo>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// A post annotated with the calling tutor's own application.
#[derive(Debug, Clone, Serialize)]
pub struct MyApplicationView {
    #[serde(flatten)]
    pub post: TuitionPostView,
    pub my_application: ApplicationView,
}

/// Business rules over the tuition post store: creation, browsing, and the
/// application lifecycle, with reference resolution for display.
pub struct TuitionPostService<P, U, E> {
    posts: Arc<P>,
    users: Arc<U>,
    events: Arc<E>,
    post_expiry: Duration,
}

impl<P, U, E> TuitionPostService<P, U, E>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(posts: Arc<P>, users: Arc<U>, events: Arc<E>, post_expiry_days: i64) -> Self {
        Self {
            posts,
            users,
            events,
            post_expiry: Duration::days(post_expiry_days),
        }
    }

    /// Create a post owned by the calling guardian.
    pub fn create_post(
        &self,
        identity: Identity,
        new_post: NewTuitionPost,
    ) -> Result<TuitionPostView, MarketplaceError> {
        if !identity.role.can_create_posts() {
            return Err(MarketplaceError::forbidden(
                "only guardians can create tuition posts",
            ));
        }
        validate_content(&new_post.title, &new_post.description, &new_post.subjects)?;
        validate_budget(&new_post.budget)?;

        let now = Utc::now();
        let post = TuitionPost {
            id: PostId::generate(),
            guardian: identity.user_id,
            title: new_post.title.trim().to_string(),
            description: new_post.description,
            subjects: new_post.subjects,
            student_info: new_post.student_info,
            requirements: new_post.requirements,
            schedule: new_post.schedule,
            budget: new_post.budget,
            location: new_post.location,
            status: PostStatus::Active,
            applications: Vec::new(),
            selected_tutor: None,
            tags: new_post.tags,
            priority: new_post.priority,
            expires_at: new_post.expires_at.unwrap_or(now + self.post_expiry),
            created_at: now,
            updated_at: now,
        };

        let stored = self.posts.insert(post)?;
        info!(post = %stored.post.id, guardian = %identity.user_id, "tuition post created");
        self.events.publish(MarketplaceEvent::NewTuitionPost {
            post_id: stored.post.id,
            title: stored.post.title.clone(),
        });
        self.view(&stored.post, now)
    }

    /// Update post fields; owner or admin only.
    pub fn update_post(
        &self,
        identity: Identity,
        post_id: PostId,
        update: UpdateTuitionPost,
    ) -> Result<TuitionPostView, MarketplaceError> {
        let (_, post) = self.with_post_mut(post_id, |post| {
            authorize_post_manager(identity, post)?;
            apply_update(post, &update)
        })?;
        self.view(&post, Utc::now())
    }

    /// Single post with resolved references; public.
    pub fn get_post(&self, post_id: PostId) -> Result<TuitionPostView, MarketplaceError> {
        let record = self
            .posts
            .fetch(post_id)?
            .ok_or(MarketplaceError::NotFound("tuition post"))?;
        self.view(&record.post, Utc::now())
    }

    /// Filtered, paginated public listing.
    pub fn list_posts(&self, query: &PostQuery) -> Result<PostPage, MarketplaceError> {
        let now = Utc::now();
        let matches: Vec<TuitionPost> = self
            .posts
            .list()?
            .into_iter()
            .filter(|post| query.matches(post, now))
            .collect();

        let (page, total) = paginate(matches, query);
        let mut views = Vec::with_capacity(page.len());
        for post in &page {
            views.push(self.view(post, now)?);
        }

        Ok(PostPage {
            posts: views,
            total,
            total_pages: total_pages(total, query.limit()),
            current_page: query.page(),
        })
    }

    /// Tutor submits an application to an active post.
    pub fn apply(
        &self,
        identity: Identity,
        post_id: PostId,
        request: ApplicationRequest,
    ) -> Result<TuitionPostView, MarketplaceError> {
        if !identity.role.can_apply() {
            return Err(MarketplaceError::forbidden(
                "only tutors can apply for tuition posts",
            ));
        }

        let now = Utc::now();
        let (_, post) = self.with_post_mut(post_id, |post| {
            lifecycle::submit_application(post, identity.user_id, request.clone(), now)
                .map_err(map_lifecycle)
        })?;

        info!(post = %post.id, tutor = %identity.user_id, "application submitted");
        self.events.publish(MarketplaceEvent::NewApplication {
            post_id: post.id,
            guardian_id: post.guardian,
            tutor_id: identity.user_id,
        });
        self.view(&post, now)
    }

    /// Guardian/admin decision on one application. Accepting fills the post
    /// and sweeps pending siblings; both mutations land in a single persist.
    pub fn update_application_status(
        &self,
        identity: Identity,
        post_id: PostId,
        application_id: ApplicationId,
        decision: ApplicationDecision,
    ) -> Result<TuitionPostView, MarketplaceError> {
        let now = Utc::now();
        let (_, post) = self.with_post_mut(post_id, |post| {
            authorize_post_manager(identity, post)?;
            lifecycle::resolve_application(post, application_id, decision, now)
                .map_err(map_lifecycle)
        })?;

        if let Some(application) = post.application(application_id) {
            info!(
                post = %post.id,
                application = %application_id,
                status = application.status.label(),
                "application status updated"
            );
            self.events.publish(MarketplaceEvent::ApplicationStatusUpdate {
                post_id: post.id,
                tutor_id: application.tutor,
                status: application.status,
            });
        }
        self.view(&post, now)
    }

    /// Tutor withdraws their own pending application.
    pub fn withdraw_application(
        &self,
        identity: Identity,
        post_id: PostId,
    ) -> Result<TuitionPostView, MarketplaceError> {
        if !identity.role.can_apply() {
            return Err(MarketplaceError::forbidden(
                "only tutors can withdraw applications",
            ));
        }

        let now = Utc::now();
        let (application_id, post) = self.with_post_mut(post_id, |post| {
            lifecycle::withdraw_application(post, identity.user_id, now).map_err(map_lifecycle)
        })?;

        info!(post = %post.id, application = %application_id, "application withdrawn");
        self.view(&post, now)
    }

    /// Guardian's own posts, or every post for an admin; newest first.
    pub fn my_posts(&self, identity: Identity) -> Result<Vec<TuitionPostView>, MarketplaceError> {
        if !identity.role.can_create_posts() {
            return Err(MarketplaceError::forbidden("access denied"));
        }

        let now = Utc::now();
        let mut posts: Vec<TuitionPost> = self
            .posts
            .list()?
            .into_iter()
            .filter(|post| identity.role.is_admin() || post.guardian == identity.user_id)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        posts.iter().map(|post| self.view(post, now)).collect()
    }

    /// Every post the calling tutor has applied to, annotated with that
    /// application, ordered by its submission time descending.
    pub fn my_applications(
        &self,
        identity: Identity,
    ) -> Result<Vec<MyApplicationView>, MarketplaceError> {
        if !identity.role.can_apply() {
            return Err(MarketplaceError::forbidden(
                "only tutors can view their applications",
            ));
        }

        let now = Utc::now();
        let mut entries: Vec<(TuitionPost, DateTime<Utc>)> = self
            .posts
            .list()?
            .into_iter()
            .filter_map(|post| {
                let applied_at = post
                    .application_by_tutor(identity.user_id)
                    .map(|application| application.applied_at)?;
                Some((post, applied_at))
            })
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        let mut views = Vec::with_capacity(entries.len());
        for (post, _) in &entries {
            let application = post
                .application_by_tutor(identity.user_id)
                .ok_or(MarketplaceError::Internal(
                    "application disappeared during annotation".to_string(),
                ))?;
            views.push(MyApplicationView {
                my_application: self.application_view(application)?,
                post: self.view(post, now)?,
            });
        }
        Ok(views)
    }

    /// Per-post atomic read-modify-write: fetch the versioned record, apply
    /// the mutation in memory, and check-and-swap it back, retrying a bounded
    /// number of times when another writer got there first.
    fn with_post_mut<T>(
        &self,
        post_id: PostId,
        mut op: impl FnMut(&mut TuitionPost) -> Result<T, MarketplaceError>,
    ) -> Result<(T, TuitionPost), MarketplaceError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut record = self
                .posts
                .fetch(post_id)?
                .ok_or(MarketplaceError::NotFound("tuition post"))?;
            let value = op(&mut record.post)?;
            match self.posts.update(record) {
                Ok(stored) => return Ok((value, stored.post)),
                Err(RepositoryError::VersionMismatch) => continue,
                Err(error) => return Err(error.into()),
            }
        }
        Err(MarketplaceError::Unavailable(
            "tuition post update contention".to_string(),
        ))
    }

    fn view(
        &self,
        post: &TuitionPost,
        now: DateTime<Utc>,
    ) -> Result<TuitionPostView, MarketplaceError> {
        let mut applications = Vec::with_capacity(post.applications.len());
        for application in &post.applications {
            applications.push(self.application_view(application)?);
        }

        let selected_tutor = match post.selected_tutor {
            Some(tutor) => self.summary(tutor)?,
            None => None,
        };

        Ok(TuitionPostView {
            id: post.id,
            guardian: self.summary(post.guardian)?,
            title: post.title.clone(),
            description: post.description.clone(),
            subjects: post.subjects.clone(),
            student_info: post.student_info.clone(),
            requirements: post.requirements.clone(),
            schedule: post.schedule.clone(),
            budget: post.budget.clone(),
            location: post.location.clone(),
            status: lifecycle::effective_status(post, now),
            applications,
            selected_tutor,
            tags: post.tags.clone(),
            priority: post.priority,
            expires_at: post.expires_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    fn application_view(
        &self,
        application: &super::domain::Application,
    ) -> Result<ApplicationView, MarketplaceError> {
        Ok(ApplicationView {
            id: application.id,
            tutor: self.summary(application.tutor)?,
            applied_at: application.applied_at,
            status: application.status,
            cover_letter: application.cover_letter.clone(),
            proposed_rate: application.proposed_rate,
            cv: application.cv.clone(),
        })
    }

    /// Missing users resolve to `None` rather than failing the whole view;
    /// references are non-owning and lookups stay best-effort.
    fn summary(&self, id: UserId) -> Result<Option<UserSummary>, MarketplaceError> {
        Ok(self.users.fetch(id)?.as_ref().map(UserSummary::from))
    }
}

fn authorize_post_manager(identity: Identity, post: &TuitionPost) -> Result<(), MarketplaceError> {
    if post.guardian == identity.user_id || identity.role.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden("not authorized"))
    }
}

fn validate_content(
    title: &str,
    description: &str,
    subjects: &[SubjectEntry],
) -> Result<(), MarketplaceError> {
    if title.trim().is_empty() {
        return Err(MarketplaceError::validation("title is required"));
    }
    if description.trim().is_empty() {
        return Err(MarketplaceError::validation("description is required"));
    }
    if subjects.is_empty() {
        return Err(MarketplaceError::validation(
            "at least one subject is required",
        ));
    }
    Ok(())
}

fn validate_budget(budget: &Budget) -> Result<(), MarketplaceError> {
    if budget.min > budget.max {
        return Err(MarketplaceError::validation(
            "budget minimum cannot exceed maximum",
        ));
    }
    Ok(())
}

fn apply_update(post: &mut TuitionPost, update: &UpdateTuitionPost) -> Result<(), MarketplaceError> {
    if let Some(status) = update.status {
        apply_status_change(post, status)?;
    }
    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(MarketplaceError::validation("title is required"));
        }
        post.title = title.trim().to_string();
    }
    if let Some(description) = &update.description {
        if description.trim().is_empty() {
            return Err(MarketplaceError::validation("description is required"));
        }
        post.description = description.clone();
    }
    if let Some(subjects) = &update.subjects {
        if subjects.is_empty() {
            return Err(MarketplaceError::validation(
                "at least one subject is required",
            ));
        }
        post.subjects = subjects.clone();
    }
    if let Some(student_info) = &update.student_info {
        post.student_info = student_info.clone();
    }
    if let Some(requirements) = &update.requirements {
        post.requirements = requirements.clone();
    }
    if let Some(schedule) = &update.schedule {
        post.schedule = schedule.clone();
    }
    if let Some(budget) = &update.budget {
        validate_budget(budget)?;
        post.budget = budget.clone();
    }
    if let Some(location) = &update.location {
        post.location = location.clone();
    }
    if let Some(tags) = &update.tags {
        post.tags = tags.clone();
    }
    if let Some(priority) = update.priority {
        post.priority = priority;
    }
    if let Some(expires_at) = update.expires_at {
        post.expires_at = expires_at;
    }
    post.updated_at = Utc::now();
    Ok(())
}

/// `filled` and `expired` are outcomes of the lifecycle, never direct
/// client writes; guardians may cancel an active post or reopen a
/// cancelled one.
fn apply_status_change(post: &mut TuitionPost, status: PostStatus) -> Result<(), MarketplaceError> {
    match (post.status, status) {
        (current, wanted) if current == wanted => Ok(()),
        (PostStatus::Active, PostStatus::Cancelled)
        | (PostStatus::Cancelled, PostStatus::Active) => {
            post.status = status;
            Ok(())
        }
        (_, PostStatus::Filled | PostStatus::Expired) => Err(MarketplaceError::validation(
            "status cannot be set directly",
        )),
        (current, _) => Err(MarketplaceError::conflict(format!(
            "cannot change a {} post",
            current.label()
        ))),
    }
}

fn map_lifecycle(error: LifecycleError) -> MarketplaceError {
    match error {
        LifecycleError::ApplicationNotFound => MarketplaceError::NotFound("application"),
        other => MarketplaceError::Conflict(other.to_string()),
    }
}
