//! Bearer-token session for collaborators that talk to the document backend.
//! The viewer itself never consults it.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait AuthSession: Send + Sync {
    fn is_valid(&self) -> bool;
    fn token(&self) -> Option<Token>;
    fn invalidate(&self);
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<u64>,
}

/// Session holding a JWT whose `exp` claim bounds its validity.
#[derive(Debug, Default)]
pub struct JwtSession {
    token: Mutex<Option<Token>>,
}

impl JwtSession {
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn login(&self, token: Token) {
        *self.token.lock() = Some(token);
    }

    fn is_valid_at(&self, now_secs: u64) -> bool {
        let guard = self.token.lock();
        let Some(token) = guard.as_ref() else {
            return false;
        };
        match expiry(token.as_str()) {
            Some(exp) => exp >= now_secs,
            None => {
                warn!("session token could not be decoded");
                false
            }
        }
    }
}

fn expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&decoded).ok()?;
    claims.exp
}

impl AuthSession for JwtSession {
    fn is_valid(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        self.is_valid_at(now)
    }

    fn token(&self) -> Option<Token> {
        self.token.lock().clone()
    }

    fn invalidate(&self) {
        debug!("session invalidated");
        self.token.lock().take();
    }
}

/// `Authorization` header value for a still-valid session.
pub fn authorization_header(session: &dyn AuthSession) -> Option<String> {
    if !session.is_valid() {
        return None;
    }
    session.token().map(|token| token.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_exp(exp: u64) -> Token {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"user"}}"#));
        Token::new(format!("{header}.{payload}.sig"))
    }

    #[test]
    fn expiry_is_checked_against_clock() {
        let session = JwtSession::new(Some(jwt_with_exp(1_000)));
        assert!(session.is_valid_at(999));
        assert!(!session.is_valid_at(1_001));
    }

    #[test]
    fn far_future_token_yields_header() {
        let token = jwt_with_exp(u64::from(u32::MAX) * 4);
        let session = JwtSession::new(Some(token.clone()));
        assert_eq!(authorization_header(&session), Some(token.as_str().to_owned()));

        session.invalidate();
        assert!(session.token().is_none());
        assert!(authorization_header(&session).is_none());
    }

    #[test]
    fn garbage_token_is_invalid() {
        let session = JwtSession::default();
        assert!(!session.is_valid());
        session.login(Token::new("not-a-jwt"));
        assert!(!session.is_valid());
    }
}
