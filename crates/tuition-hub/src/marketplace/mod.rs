//! Marketplace domain: identity, tutor profiles, and tuition posts.
//!
//! Each submodule follows the same layout: a `domain` module with the owned
//! data model, a `repository` module with the storage trait the services
//! depend on, a `service` module with the business rules, and a `router`
//! module exposing the HTTP surface. The tuition post module additionally
//! carries the application lifecycle engine and the browse filter.

pub mod error;
pub mod identity;
pub mod posts;
pub mod tutors;

pub use error::{MarketplaceError, RepositoryError};
