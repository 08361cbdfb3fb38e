use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::identity::{UserId, UserSummary};
use crate::marketplace::posts::TeachingMode;

/// Identifier wrapper for tutor profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TutorProfileId(pub Uuid);

impl TutorProfileId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TutorProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Subject a tutor offers, with the hourly price for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectOffering {
    pub name: String,
    pub level: String,
    pub hourly_rate: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

/// One student's review of a tutor. At most one per (tutor, student) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub student: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// One-to-one extension of a tutor-role user.
///
/// Invariant: `rating` is the exact arithmetic mean of all review ratings,
/// recomputed on every insert, and 0.0 while there are no reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorProfile {
    pub id: TutorProfileId,
    pub user: UserId,
    pub subjects: Vec<SubjectOffering>,
    pub experience_years: u8,
    pub education: Education,
    pub availability: Vec<AvailabilitySlot>,
    pub teaching_modes: Vec<TeachingMode>,
    pub rating: f64,
    pub reviews: Vec<Review>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TutorProfile {
    pub fn review_by(&self, student: UserId) -> Option<&Review> {
        self.reviews.iter().find(|review| review.student == student)
    }

    /// Recompute the stored mean from the current review list.
    pub fn recompute_rating(&mut self) {
        if self.reviews.is_empty() {
            self.rating = 0.0;
            return;
        }
        let total: u32 = self
            .reviews
            .iter()
            .map(|review| u32::from(review.rating))
            .sum();
        self.rating = f64::from(total) / self.reviews.len() as f64;
    }
}

/// Profile view with the owning user and reviewers resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TutorProfileView {
    pub id: TutorProfileId,
    pub user: Option<UserSummary>,
    pub subjects: Vec<SubjectOffering>,
    pub experience_years: u8,
    pub education: Education,
    pub availability: Vec<AvailabilitySlot>,
    pub teaching_modes: Vec<TeachingMode>,
    pub rating: f64,
    pub reviews: Vec<ReviewView>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub student: Option<UserSummary>,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
