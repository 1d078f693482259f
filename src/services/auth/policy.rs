//! Route access policies and their evaluation.
//!
//! Decision table (first matching row wins):
//!
//! | required set                         | outcome                                   |
//! |--------------------------------------|-------------------------------------------|
//! | empty, or contains `PUBLIC`          | allowed, no identity, nothing verified    |
//! | no credential found                  | 401 `credential required`                 |
//! | credential fails verification        | 403 `credential invalid or expired`       |
//! | `AUTHENTICATED` and no role tokens   | allowed with identity                     |
//! | role tokens, role not listed         | 403 `access denied`                       |
//! | role tokens, role listed             | allowed with identity                     |
//!
//! Role matching is exact. There is no hierarchy: an `ADMIN` identity does
//! not satisfy `[USER]`. Routes open to several roles list each of them.
//!
//! An absent role claim was already defaulted to `USER` by the normalizer, so
//! an identity without a role only comes from a role outside the vocabulary.
//! That role is listed by no route and is answered like any unlisted role.

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::credential::{CredentialExtractor, CredentialSource};
use super::identity::{self, Identity, Role};
use super::token::{TokenError, TokenVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Policy {
    Public,
    Authenticated,
    User,
    UserPremium,
    Admin,
}

impl Policy {
    /// The role this policy requires, if it is a role policy.
    pub fn role(&self) -> Option<Role> {
        match self {
            Policy::Public | Policy::Authenticated => None,
            Policy::User => Some(Role::User),
            Policy::UserPremium => Some(Role::UserPremium),
            Policy::Admin => Some(Role::Admin),
        }
    }
}

impl From<Role> for Policy {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Policy::User,
            Role::UserPremium => Policy::UserPremium,
            Role::Admin => Policy::Admin,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Policy::Public => "PUBLIC",
            Policy::Authenticated => "AUTHENTICATED",
            Policy::User => "USER",
            Policy::UserPremium => "USER_PREMIUM",
            Policy::Admin => "ADMIN",
        };
        f.write_str(s)
    }
}

/// Ordered, de-duplicated policy list attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet(Arc<[Policy]>);

impl PolicySet {
    pub fn new(policies: impl IntoIterator<Item = Policy>) -> Self {
        let mut out: Vec<Policy> = Vec::new();
        for p in policies {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        Self(out.into())
    }

    pub fn public() -> Self {
        Self::new([Policy::Public])
    }

    pub fn contains(&self, policy: Policy) -> bool {
        self.0.contains(&policy)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Policy> + '_ {
        self.0.iter().copied()
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.iter().filter_map(|p| p.role())
    }

    pub fn requires_role(&self) -> bool {
        self.roles().next().is_some()
    }

    pub fn allows_role(&self, role: Role) -> bool {
        self.roles().any(|r| r == role)
    }

    /// Empty or `PUBLIC`: no credential is looked at.
    pub fn is_unrestricted(&self) -> bool {
        self.is_empty() || self.contains(Policy::Public)
    }
}

impl fmt::Display for PolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, p) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str("]")
    }
}

impl From<Policy> for PolicySet {
    fn from(policy: Policy) -> Self {
        Self::new([policy])
    }
}

impl<const N: usize> From<[Policy; N]> for PolicySet {
    fn from(policies: [Policy; N]) -> Self {
        Self::new(policies)
    }
}

impl From<&[Policy]> for PolicySet {
    fn from(policies: &[Policy]) -> Self {
        Self::new(policies.iter().copied())
    }
}

impl From<Vec<Policy>> for PolicySet {
    fn from(policies: Vec<Policy>) -> Self {
        Self::new(policies)
    }
}

impl From<Option<PolicySet>> for PolicySet {
    fn from(policies: Option<PolicySet>) -> Self {
        policies.unwrap_or_default()
    }
}

/// Why a request was refused by the policy stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("credential required")]
    MissingCredential,
    #[error("credential invalid or expired")]
    InvalidCredential(TokenError),
    #[error("access denied")]
    InsufficientRole,
}

impl AccessDenied {
    /// Missing credential is 401; a present but rejected credential is 403.
    pub fn status(&self) -> StatusCode {
        match self {
            AccessDenied::MissingCredential => StatusCode::UNAUTHORIZED,
            AccessDenied::InvalidCredential(_) | AccessDenied::InsufficientRole => {
                StatusCode::FORBIDDEN
            }
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allowed(Option<Identity>),
    Denied(AccessDenied),
}

impl Outcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed(_))
    }
}

/// Shared, immutable evaluator. One instance per process, cloned via `Arc`.
#[derive(Clone)]
pub struct PolicyEvaluator {
    extractor: CredentialExtractor,
    verifier: Arc<dyn TokenVerifier>,
}

impl fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl PolicyEvaluator {
    pub fn new(extractor: CredentialExtractor, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            extractor,
            verifier,
        }
    }

    pub fn extractor(&self) -> &CredentialExtractor {
        &self.extractor
    }

    pub fn evaluate(&self, policies: &PolicySet, headers: &HeaderMap) -> Outcome {
        // PUBLIC dominates any other token in the same set.
        if policies.is_unrestricted() {
            return Outcome::Allowed(None);
        }

        let identity = match self.authenticate(headers) {
            Ok(identity) => identity,
            Err(denied) => return Outcome::Denied(denied),
        };

        if policies.contains(Policy::Authenticated) && !policies.requires_role() {
            return Outcome::Allowed(Some(identity));
        }

        match identity.role {
            Some(role) if policies.allows_role(role) => Outcome::Allowed(Some(identity)),
            Some(role) => {
                tracing::debug!(%role, required = %policies, "role not permitted");
                Outcome::Denied(AccessDenied::InsufficientRole)
            }
            None => {
                tracing::debug!(required = %policies, "unrecognized role not permitted");
                Outcome::Denied(AccessDenied::InsufficientRole)
            }
        }
    }

    /// Best-effort lookup: the identity if a usable credential is present.
    pub fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        self.authenticate(headers).ok()
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AccessDenied> {
        let credential = self
            .extractor
            .extract(headers)
            .ok_or(AccessDenied::MissingCredential)?;

        let claims = self.verifier.verify(&credential.token).map_err(|err| {
            log_rejected(credential.source, &err);
            AccessDenied::InvalidCredential(err)
        })?;

        Ok(identity::normalize(&claims))
    }
}

fn log_rejected(source: CredentialSource, err: &TokenError) {
    match err {
        TokenError::Expired => tracing::debug!(?source, "credential expired"),
        TokenError::Invalid(_) => tracing::warn!(?source, error = %err, "credential verification failed"),
    }
}
