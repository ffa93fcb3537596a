//! Typed wrappers over the backend routes the console uses
//!
//! Each submodule adds methods to [`crate::ApiClient`] for one area of the
//! backend and defines the small result types those methods return.

mod admin;
mod analytics;
mod auth;
mod notifications;
mod organizations;
mod portal;

pub use admin::{CourseRequestList, PasswordReset};
pub use notifications::NotificationSent;
pub use organizations::{CoursesAssigned, OrganizationCreated};
pub use portal::{CourseAssignmentTarget, EmployeeRoster};
