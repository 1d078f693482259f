//! Bearer credential lookup across the supported transports.
//!
//! Precedence:
//! 1. signed cookie `<cookie_name>`
//! 2. plain cookie `<cookie_name>` (tolerant fallback)
//! 3. `Authorization: Bearer <token>`
//!
//! No credential is a normal state (anonymous caller), so lookup returns
//! `Option`, never an error.

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{CookieJar, Key, SignedCookieJar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SignedCookie,
    Cookie,
    AuthorizationHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: CredentialSource,
}

#[derive(Clone)]
pub struct CredentialExtractor {
    cookie_name: String,
    key: Key,
}

impl std::fmt::Debug for CredentialExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialExtractor")
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl CredentialExtractor {
    pub fn new(cookie_name: impl Into<String>, key: Key) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            key,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn extract(&self, headers: &HeaderMap) -> Option<Credential> {
        let signed = SignedCookieJar::from_headers(headers, self.key.clone());
        if let Some(token) = signed.get(&self.cookie_name).and_then(|c| non_empty(c.value())) {
            return Some(Credential {
                token,
                source: CredentialSource::SignedCookie,
            });
        }

        let plain = CookieJar::from_headers(headers);
        if let Some(token) = plain.get(&self.cookie_name).and_then(|c| non_empty(c.value())) {
            return Some(Credential {
                token,
                source: CredentialSource::Cookie,
            });
        }

        bearer_token(headers).map(|token| Credential {
            token,
            source: CredentialSource::AuthorizationHeader,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(non_empty)
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    fn key() -> Key {
        Key::from(&[7u8; 64])
    }

    fn extractor() -> CredentialExtractor {
        CredentialExtractor::new("currentUser", key())
    }

    /// `name=value` pair as a browser would send back a signed cookie.
    fn signed_cookie_header(name: &str, value: &str) -> String {
        let jar = SignedCookieJar::new(key()).add(Cookie::new(name.to_string(), value.to_string()));
        let response = axum::response::IntoResponse::into_response((jar, ()));
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn no_credential_is_none() {
        assert_eq!(extractor().extract(&HeaderMap::new()), None);
    }

    #[test]
    fn signed_cookie_is_preferred() {
        let cookie = signed_cookie_header("currentUser", "from-signed");
        let h = headers(&[
            (header::COOKIE, cookie.as_str()),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);

        let credential = extractor().extract(&h).unwrap();
        assert_eq!(credential.token, "from-signed");
        assert_eq!(credential.source, CredentialSource::SignedCookie);
    }

    #[test]
    fn plain_cookie_is_used_when_unsigned() {
        let h = headers(&[
            (header::COOKIE, "currentUser=plain-token"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);

        let credential = extractor().extract(&h).unwrap();
        assert_eq!(credential.token, "plain-token");
        assert_eq!(credential.source, CredentialSource::Cookie);
    }

    #[test]
    fn authorization_header_is_last_resort() {
        let h = headers(&[
            (header::COOKIE, "other=value"),
            (header::AUTHORIZATION, "Bearer abc.def.ghi"),
        ]);

        let credential = extractor().extract(&h).unwrap();
        assert_eq!(credential.token, "abc.def.ghi");
        assert_eq!(credential.source, CredentialSource::AuthorizationHeader);
    }

    #[test]
    fn non_bearer_or_empty_header_is_ignored() {
        assert_eq!(
            extractor().extract(&headers(&[(header::AUTHORIZATION, "Basic Zm9vOmJhcg==")])),
            None
        );
        assert_eq!(extractor().extract(&headers(&[(header::AUTHORIZATION, "Bearer ")])), None);
        assert_eq!(extractor().extract(&headers(&[(header::COOKIE, "currentUser=")])), None);
    }
}
