//! Polling tiers

use impact_core::config::RefreshConfig;
use std::time::Duration;

/// How often a panel is refetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshInterval {
    /// Live counters: system stats, users, organizations
    Fast,
    /// Rosters: portal admins
    Standard,
    /// Aggregates: analytics, organization statistics
    Slow,
}

impl RefreshInterval {
    /// Period for this tier under `config`
    #[must_use]
    pub const fn period(self, config: &RefreshConfig) -> Duration {
        match self {
            Self::Fast => config.fast(),
            Self::Standard => config.standard(),
            Self::Slow => config.slow(),
        }
    }
}
