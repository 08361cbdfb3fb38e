use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::marketplace::error::{MarketplaceError, RepositoryError};
use crate::marketplace::identity::{Identity, UserId, UserRepository, UserSummary};
use crate::marketplace::posts::TeachingMode;

use super::domain::{
    AvailabilitySlot, Education, Review, ReviewView, SubjectOffering, TutorProfile,
    TutorProfileId, TutorProfileView,
};
use super::repository::TutorRepository;

const MAX_LISTING: usize = 50;

/// Tutor-authored profile content at creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTutorProfile {
    pub subjects: Vec<SubjectOffering>,
    pub experience_years: u8,
    #[serde(default)]
    pub education: Education,
    #[serde(default)]
    pub availability: Vec<AvailabilitySlot>,
    #[serde(default = "default_modes")]
    pub teaching_modes: Vec<TeachingMode>,
}

fn default_modes() -> Vec<TeachingMode> {
    vec![TeachingMode::Both]
}

/// Editable subset for profile updates; reviews and rating are derived
/// state and never client-assignable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTutorProfile {
    #[serde(default)]
    pub subjects: Option<Vec<SubjectOffering>>,
    #[serde(default)]
    pub experience_years: Option<u8>,
    #[serde(default)]
    pub education: Option<Education>,
    #[serde(default)]
    pub availability: Option<Vec<AvailabilitySlot>>,
    #[serde(default)]
    pub teaching_modes: Option<Vec<TeachingMode>>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Review submission; rating must be 1..=5.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Browse filter for the public tutor listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TutorQuery {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub min_price: Option<u32>,
    #[serde(default)]
    pub max_price: Option<u32>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl TutorQuery {
    fn matches(&self, profile: &TutorProfile) -> bool {
        if !profile.active {
            return false;
        }

        if let Some(subject) = &self.subject {
            let needle = subject.to_lowercase();
            if !profile
                .subjects
                .iter()
                .any(|offering| offering.name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if !profile
                .subjects
                .iter()
                .any(|offering| offering.hourly_rate >= min)
            {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if !profile
                .subjects
                .iter()
                .any(|offering| offering.hourly_rate <= max)
            {
                return false;
            }
        }

        if let Some(minimum) = self.rating {
            if profile.rating < minimum {
                return false;
            }
        }

        true
    }
}

/// Business rules over the tutor profile store.
pub struct TutorService<T, U> {
    tutors: Arc<T>,
    users: Arc<U>,
}

impl<T, U> TutorService<T, U>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
{
    pub fn new(tutors: Arc<T>, users: Arc<U>) -> Self {
        Self { tutors, users }
    }

    /// Create the caller's profile; tutors only, one per user.
    pub fn create_profile(
        &self,
        identity: Identity,
        new_profile: NewTutorProfile,
    ) -> Result<TutorProfileView, MarketplaceError> {
        if !identity.role.can_offer_tutoring() {
            return Err(MarketplaceError::forbidden(
                "only tutors can create tutor profiles",
            ));
        }
        if new_profile.subjects.is_empty() {
            return Err(MarketplaceError::validation(
                "at least one subject offering is required",
            ));
        }
        if self.tutors.fetch_by_user(identity.user_id)?.is_some() {
            return Err(MarketplaceError::conflict("tutor profile already exists"));
        }

        let profile = TutorProfile {
            id: TutorProfileId::generate(),
            user: identity.user_id,
            subjects: new_profile.subjects,
            experience_years: new_profile.experience_years,
            education: new_profile.education,
            availability: new_profile.availability,
            teaching_modes: new_profile.teaching_modes,
            rating: 0.0,
            reviews: Vec::new(),
            active: true,
            created_at: Utc::now(),
        };

        let stored = self.tutors.insert(profile).map_err(|error| match error {
            RepositoryError::Conflict => {
                MarketplaceError::conflict("tutor profile already exists")
            }
            other => other.into(),
        })?;
        info!(tutor = %stored.user, profile = %stored.id, "tutor profile created");
        self.view(&stored)
    }

    /// Update a profile; owner or admin only.
    pub fn update_profile(
        &self,
        identity: Identity,
        profile_id: TutorProfileId,
        update: UpdateTutorProfile,
    ) -> Result<TutorProfileView, MarketplaceError> {
        let mut profile = self
            .tutors
            .fetch(profile_id)?
            .ok_or(MarketplaceError::NotFound("tutor"))?;

        if profile.user != identity.user_id && !identity.role.is_admin() {
            return Err(MarketplaceError::forbidden("not authorized"));
        }

        if let Some(subjects) = update.subjects {
            if subjects.is_empty() {
                return Err(MarketplaceError::validation(
                    "at least one subject offering is required",
                ));
            }
            profile.subjects = subjects;
        }
        if let Some(experience_years) = update.experience_years {
            profile.experience_years = experience_years;
        }
        if let Some(education) = update.education {
            profile.education = education;
        }
        if let Some(availability) = update.availability {
            profile.availability = availability;
        }
        if let Some(teaching_modes) = update.teaching_modes {
            profile.teaching_modes = teaching_modes;
        }
        if let Some(active) = update.active {
            profile.active = active;
        }

        self.tutors.update(profile.clone())?;
        self.view(&profile)
    }

    /// Single profile with resolved references; public.
    pub fn get_profile(
        &self,
        profile_id: TutorProfileId,
    ) -> Result<TutorProfileView, MarketplaceError> {
        let profile = self
            .tutors
            .fetch(profile_id)?
            .ok_or(MarketplaceError::NotFound("tutor"))?;
        self.view(&profile)
    }

    /// Filtered public listing, best-rated first, capped at 50 entries.
    pub fn list_profiles(
        &self,
        query: &TutorQuery,
    ) -> Result<Vec<TutorProfileView>, MarketplaceError> {
        let mut profiles: Vec<TutorProfile> = self
            .tutors
            .list()?
            .into_iter()
            .filter(|profile| query.matches(profile))
            .collect();
        profiles.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
        });
        profiles.truncate(MAX_LISTING);

        profiles.iter().map(|profile| self.view(profile)).collect()
    }

    /// The calling tutor's own profile.
    pub fn my_profile(&self, identity: Identity) -> Result<TutorProfileView, MarketplaceError> {
        if !identity.role.can_offer_tutoring() {
            return Err(MarketplaceError::forbidden(
                "only tutors can access this endpoint",
            ));
        }
        let profile = self
            .tutors
            .fetch_by_user(identity.user_id)?
            .ok_or(MarketplaceError::NotFound("tutor profile"))?;
        self.view(&profile)
    }

    /// Add a review and recompute the stored mean; one review per student.
    /// Validation runs before any read or write.
    pub fn add_review(
        &self,
        identity: Identity,
        profile_id: TutorProfileId,
        request: ReviewRequest,
    ) -> Result<TutorProfileView, MarketplaceError> {
        if !(1..=5).contains(&request.rating) {
            return Err(MarketplaceError::validation(
                "rating must be between 1 and 5",
            ));
        }

        let mut profile = self
            .tutors
            .fetch(profile_id)?
            .ok_or(MarketplaceError::NotFound("tutor"))?;

        if profile.review_by(identity.user_id).is_some() {
            return Err(MarketplaceError::conflict(
                "you have already reviewed this tutor",
            ));
        }

        profile.reviews.push(Review {
            student: identity.user_id,
            rating: request.rating,
            comment: request.comment,
            created_at: Utc::now(),
        });
        profile.recompute_rating();

        self.tutors.update(profile.clone())?;
        info!(
            tutor = %profile.user,
            rating = request.rating,
            mean = profile.rating,
            "review recorded"
        );
        self.view(&profile)
    }

    fn view(&self, profile: &TutorProfile) -> Result<TutorProfileView, MarketplaceError> {
        let mut reviews = Vec::with_capacity(profile.reviews.len());
        for review in &profile.reviews {
            reviews.push(ReviewView {
                student: self.summary(review.student)?,
                rating: review.rating,
                comment: review.comment.clone(),
                created_at: review.created_at,
            });
        }

        Ok(TutorProfileView {
            id: profile.id,
            user: self.summary(profile.user)?,
            subjects: profile.subjects.clone(),
            experience_years: profile.experience_years,
            education: profile.education.clone(),
            availability: profile.availability.clone(),
            teaching_modes: profile.teaching_modes.clone(),
            rating: profile.rating,
            reviews,
            active: profile.active,
            created_at: profile.created_at,
        })
    }

    fn summary(&self, id: UserId) -> Result<Option<UserSummary>, MarketplaceError> {
        Ok(self.users.fetch(id)?.as_ref().map(UserSummary::from))
    }
}
