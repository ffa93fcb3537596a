//! Impact admin console
//!
//! Server-rendered dashboards for LMS super admins and organization portal
//! admins, backed by the LMS REST API.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod analytics;
pub mod cards;
pub mod components;
pub mod device;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod render;
pub mod routes;
pub mod server;
pub mod state;
pub mod views;

// Re-export the main functions
pub use error::{WebError, WebResult};
pub use server::{build_app, build_app_with_state};
pub use state::{AppState, SharedState};
