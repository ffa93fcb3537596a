//! Session tokens and role handling
//!
//! The console never verifies token signatures; the backend does that on
//! every request. Claims are decoded once when a request enters the console
//! and the resulting [`Session`] is passed to whatever needs the identity.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::EntityId;

/// Console roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Super admin, sees every tenant
    Admin,
    /// Tenant admin, scoped to one organization
    PortalAdmin,
    /// Learner; has no console access
    Employee,
}

impl Role {
    /// Parse a role claim, tolerating case, whitespace and legacy spellings
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Some(Self::Admin),
            "portal_admin" | "portaladmin" | "portal-admin" => Some(Self::PortalAdmin),
            "employee" | "user" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Canonical wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::PortalAdmin => "portal_admin",
            Self::Employee => "employee",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::PortalAdmin => "Portal Administrator",
            Self::Employee => "Employee",
        }
    }

    /// Whether this role has a console shell
    #[must_use]
    pub const fn has_console(self) -> bool {
        matches!(self, Self::Admin | Self::PortalAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| crate::Error::UnauthorizedRole {
            role: s.to_string(),
        })
    }
}

/// Claims carried by the backend's access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub user_id: EntityId,
    /// Login name
    pub username: String,
    /// Raw role string
    #[serde(default)]
    pub role: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Organization id for tenant users
    #[serde(default)]
    pub org_id: Option<EntityId>,
    /// Organization name for tenant users
    #[serde(default)]
    pub org_name: Option<String>,
    /// `access` or `refresh`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Expiry, seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issue time, seconds since the epoch
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Identity of the person using the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// User id
    pub user_id: EntityId,
    /// Login name
    pub username: String,
    /// Normalized role; `None` when the claim matched no known role
    pub role: Option<Role>,
    /// Role claim exactly as issued
    pub raw_role: String,
    /// Email address
    pub email: Option<String>,
    /// Organization id for tenant users
    pub org_id: Option<EntityId>,
    /// Organization name for tenant users
    pub org_name: Option<String>,
    /// Expiry; `None` when the token has no `exp` claim
    pub expires_at: Option<DateTime<Utc>>,
    token: String,
}

impl Session {
    /// Decode a bearer token without verifying its signature
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Authentication`] if the token is not a
    /// well-formed JWT or its claims lack `user_id`/`username`.
    pub fn decode(token: &str) -> crate::Result<Self> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| crate::Error::Authentication(format!("Invalid token: {e}")))?;

        Ok(Self::from_claims(data.claims, token.to_string()))
    }

    /// Decode a token and reject it when it has expired at `now`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Authentication`] for malformed or expired tokens.
    pub fn decode_active(token: &str, now: DateTime<Utc>) -> crate::Result<Self> {
        let session = Self::decode(token)?;
        if session.is_expired_at(now) {
            return Err(crate::Error::Authentication("token expired".to_string()));
        }
        Ok(session)
    }

    /// Build a session from already decoded claims
    #[must_use]
    pub fn from_claims(claims: Claims, token: String) -> Self {
        let expires_at = claims
            .exp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Self {
            user_id: claims.user_id,
            username: claims.username,
            role: Role::parse(&claims.role),
            raw_role: claims.role,
            email: claims.email,
            org_id: claims.org_id,
            org_name: claims.org_name,
            expires_at,
            token,
        }
    }

    /// Tokens without an expiry are treated as expired
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| now >= exp)
    }

    /// The raw bearer token, forwarded to the backend
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}
