//! Canonical identity derived from verified token claims.
//!
//! Every place that turns claims into an identity goes through [`normalize`],
//! so the policy stage and the on-demand `MaybeUser` lookup always agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::token::Claims;

/// Role vocabulary. Serialized uppercase (`USER`, `USER_PREMIUM`, `ADMIN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    UserPremium,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::UserPremium => "USER_PREMIUM",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// Case-insensitive: `admin`, `Admin` and `ADMIN` all parse to [`Role::Admin`].
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "USER_PREMIUM" => Ok(Role::UserPremium),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Request-scoped caller identity.
///
/// - `id` comes from the `id` claim, falling back to `sub`
/// - `role` is `None` only when the token carried a role outside the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl Identity {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}

pub fn normalize(claims: &Claims) -> Identity {
    let id = non_empty(claims.id.as_deref()).or_else(|| non_empty(claims.sub.as_deref()));

    let role = match non_empty(claims.role.as_deref()) {
        None => Some(Role::User),
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(err) => {
                tracing::debug!(error = %err, "token role outside vocabulary");
                None
            }
        },
    };

    Identity {
        id,
        email: non_empty(claims.email.as_deref()),
        role,
    }
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
