//! TuitionHub marketplace backend.
//!
//! Connects guardians posting tuition requests with tutors applying to them,
//! plus administrative oversight. The crate is organized as a domain library:
//! storage sits behind repository traits so services can be exercised without
//! a live document store, and the HTTP surface is a set of per-module axum
//! routers composed by the `services/api` binary.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod realtime;
pub mod telemetry;
