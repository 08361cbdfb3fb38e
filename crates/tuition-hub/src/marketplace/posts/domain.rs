use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::identity::{UserId, UserSummary};

/// Identifier wrapper for tuition posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for applications embedded in a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Subject levels a post or tutor offering can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectLevel {
    Elementary,
    Middle,
    High,
    College,
    Professional,
}

/// Delivery mode for lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeachingMode {
    Online,
    Offline,
    Both,
}

impl TeachingMode {
    /// Whether a tutor offering `self` satisfies a post requiring `required`.
    pub const fn satisfies(self, required: TeachingMode) -> bool {
        matches!(
            (self, required),
            (TeachingMode::Both, _)
                | (_, TeachingMode::Both)
                | (TeachingMode::Online, TeachingMode::Online)
                | (TeachingMode::Offline, TeachingMode::Offline)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPreference {
    Male,
    Female,
    Any,
}

impl Default for GenderPreference {
    fn default() -> Self {
        Self::Any
    }
}

/// Post lifecycle states. `Active` is the only initial state; the other
/// three are terminal with respect to accepting new applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Filled,
    Expired,
    Cancelled,
}

impl PostStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Filled => "filled",
            PostStatus::Expired => "expired",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

/// Embedded application states. `Pending` is initial; the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Urgency tier used to order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    pub const fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

/// Subject requested by a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub name: String,
    pub level: SubjectLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub current_level: Option<String>,
    #[serde(default)]
    pub learning_goals: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub min_experience_years: u8,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default = "default_teaching_mode")]
    pub teaching_mode: TeachingMode,
    #[serde(default)]
    pub preferred_gender: GenderPreference,
}

const fn default_teaching_mode() -> TeachingMode {
    TeachingMode::Both
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            min_experience_years: 0,
            qualifications: Vec::new(),
            teaching_mode: TeachingMode::Both,
            preferred_gender: GenderPreference::Any,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub days_per_week: Option<u8>,
    #[serde(default)]
    pub hours_per_session: Option<f32>,
    #[serde(default)]
    pub preferred_times: Vec<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub min: u32,
    pub max: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Uploaded CV descriptor attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvAttachment {
    pub filename: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A tutor's bid on a post. Owned by the post aggregate: an application
/// cannot exist, be queried, or be mutated outside its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub tutor: UserId,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub cover_letter: String,
    pub proposed_rate: u32,
    #[serde(default)]
    pub cv: Option<CvAttachment>,
}

/// The central marketplace entity: a guardian's request for a tutor.
///
/// Invariants maintained by the lifecycle engine:
/// - `selected_tutor` is set if and only if `status == Filled`;
/// - at most one application is `Accepted`;
/// - at most one application per tutor, regardless of its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuitionPost {
    pub id: PostId,
    pub guardian: UserId,
    pub title: String,
    pub description: String,
    pub subjects: Vec<SubjectEntry>,
    pub student_info: StudentInfo,
    pub requirements: Requirements,
    pub schedule: Schedule,
    pub budget: Budget,
    pub location: Location,
    pub status: PostStatus,
    pub applications: Vec<Application>,
    pub selected_tutor: Option<UserId>,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TuitionPost {
    pub fn application(&self, id: ApplicationId) -> Option<&Application> {
        self.applications.iter().find(|app| app.id == id)
    }

    pub fn application_by_tutor(&self, tutor: UserId) -> Option<&Application> {
        self.applications.iter().find(|app| app.tutor == tutor)
    }
}

/// Post view with guardian/tutor references resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct TuitionPostView {
    pub id: PostId,
    pub guardian: Option<UserSummary>,
    pub title: String,
    pub description: String,
    pub subjects: Vec<SubjectEntry>,
    pub student_info: StudentInfo,
    pub requirements: Requirements,
    pub schedule: Schedule,
    pub budget: Budget,
    pub location: Location,
    pub status: PostStatus,
    pub applications: Vec<ApplicationView>,
    pub selected_tutor: Option<UserSummary>,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Embedded application with its tutor reference resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub tutor: Option<UserSummary>,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub cover_letter: String,
    pub proposed_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv: Option<CvAttachment>,
}
