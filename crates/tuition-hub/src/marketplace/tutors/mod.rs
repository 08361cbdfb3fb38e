//! Tutor profiles: subject offerings, availability, and reviews.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AvailabilitySlot, Education, Review, ReviewView, SubjectOffering, TutorProfile,
    TutorProfileId, TutorProfileView,
};
pub use repository::TutorRepository;
pub use router::tutor_router;
pub use service::{NewTutorProfile, ReviewRequest, TutorQuery, TutorService, UpdateTutorProfile};
