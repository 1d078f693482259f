use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{AccessDenied, Identity, PolicyEvaluator};

/// Handler で Identity を受け取るための extractor
///
/// The policy stage must have stored an identity (any non-PUBLIC route).
/// If it is missing the route was registered as PUBLIC or without policies,
/// which is answered with the same 401 a missing credential gets.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AccessDenied::MissingCredential.into())
    }
}

/// Allows `Option<CurrentUser>` in handler signatures.
impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().map(CurrentUser))
    }
}

/// Identity if the caller presented a usable credential; never rejects.
///
/// Uses the identity stored by the policy stage when there is one. Otherwise
/// (PUBLIC routes) the credential is resolved here, on demand, so only
/// handlers that ask for it pay for verification.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<PolicyEvaluator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(MaybeUser(Some(identity.clone())));
        }

        let evaluator = Arc::<PolicyEvaluator>::from_ref(state);
        let identity = evaluator.identify(&parts.headers);
        if let Some(identity) = &identity {
            parts.extensions.insert(identity.clone());
        }
        Ok(MaybeUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{Request, StatusCode, header};
    use axum::response::IntoResponse;
    use axum_extra::extract::cookie::Key;

    use crate::services::auth::{Claims, CredentialExtractor, Role, TokenError, TokenVerifier};

    fn identity() -> Identity {
        Identity {
            id: Some("u-1".to_string()),
            email: Some("ana@example.com".to_string()),
            role: Some(Role::Admin),
        }
    }

    #[tokio::test]
    async fn current_user_reads_extension() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut().insert(identity());
        let (mut parts, _) = req.into_parts();

        let CurrentUser(found) = <CurrentUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found, identity());
    }

    #[tokio::test]
    async fn current_user_missing_is_401() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let rejection = <CurrentUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    /// Verifier that accepts every token as an ADMIN and counts calls.
    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    impl TokenVerifier for CountingVerifier {
        fn verify(&self, _token: &str) -> Result<Claims, TokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Claims {
                sub: Some("u-9".to_string()),
                id: None,
                email: None,
                role: Some("admin".to_string()),
                iat: None,
                exp: u64::MAX,
            })
        }
    }

    fn evaluator(verifier: Arc<CountingVerifier>) -> Arc<PolicyEvaluator> {
        Arc::new(PolicyEvaluator::new(
            CredentialExtractor::new("currentUser", Key::from(&[5u8; 64])),
            verifier,
        ))
    }

    #[tokio::test]
    async fn maybe_user_is_none_for_guests() {
        let verifier = Arc::new(CountingVerifier::default());
        let state = evaluator(verifier.clone());
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let MaybeUser(found) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(found.is_none());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn maybe_user_prefers_stored_identity() {
        let verifier = Arc::new(CountingVerifier::default());
        let state = evaluator(verifier.clone());
        let mut req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer tok")
            .body(())
            .unwrap();
        req.extensions_mut().insert(identity());
        let (mut parts, _) = req.into_parts();

        let MaybeUser(found) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found, Some(identity()));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn maybe_user_resolves_credential_once() {
        let verifier = Arc::new(CountingVerifier::default());
        let state = evaluator(verifier.clone());
        let (mut parts, _) = Request::builder()
            .header(header::AUTHORIZATION, "Bearer tok")
            .body(())
            .unwrap()
            .into_parts();

        let MaybeUser(first) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();
        let MaybeUser(second) = MaybeUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(first.as_ref().and_then(|i| i.role), Some(Role::Admin));
        assert_eq!(first, second);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }
}
