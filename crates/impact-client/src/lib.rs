//! Typed REST client for the LMS backend
//!
//! [`ApiClient`] wraps `reqwest`, decodes the backend's `{success, ...}`
//! envelope and refreshes expired access tokens once per call. Endpoint
//! methods live in [`endpoints`], grouped by backend area.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;

pub use client::ApiClient;
pub use endpoints::{
    CourseAssignmentTarget, CourseRequestList, CoursesAssigned, EmployeeRoster, NotificationSent,
    OrganizationCreated, PasswordReset,
};
pub use error::{ClientError, ClientResult};
