pub mod credential;
pub mod factory;
pub mod identity;
pub mod issuer;
pub mod policy;
pub mod token;

pub use credential::{Credential, CredentialExtractor, CredentialSource};
pub use factory::{build_policy_evaluator, build_token_issuer, cookie_key};
pub use identity::{Identity, Role};
pub use issuer::{IssuedToken, TokenIssuer};
pub use policy::{AccessDenied, Outcome, Policy, PolicyEvaluator, PolicySet};
pub use token::{Claims, JwtVerifier, TokenError, TokenVerifier};
