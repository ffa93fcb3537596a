//! Polling refresh for dashboard panels
//!
//! A page that becomes visible activates one panel with
//! [`RefreshScheduler::activate`]. The returned [`PanelHandle`] exposes the
//! latest [`PanelState`] and stops the poller when it is deactivated or
//! dropped, so navigating away never leaves a timer behind.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod error;
pub mod interval;
pub mod panel;
pub mod scheduler;

pub use error::{RefreshError, Result};
pub use interval::RefreshInterval;
pub use panel::{PanelHandle, PanelState};
pub use scheduler::RefreshScheduler;
