//! Opaque session lifecycle: minting, verification, and lazy rotation.
//!
//! The verifier decides; the caller persists. Rotation happens on the first
//! authenticated request after expiry, and every caller must commit the
//! rotated pair (and reset the cookie) before responding, or server and
//! client state diverge and the user is logged out on the next request.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::repository::IdentityRepository;
use crate::error::Result;
use crate::models::identity::{Identity, SessionTokens};

/// The session cookie payload presented by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCookie {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// The verifier's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionVerdict {
    pub verified: bool,
    pub needs_rotation: bool,
    /// The pair the caller should consider current: the stored pair on an
    /// idempotent read, a freshly minted pair when rotation is needed, absent
    /// when the session is denied.
    pub tokens: Option<SessionTokens>,
}

impl SessionVerdict {
    fn denied() -> Self {
        Self {
            verified: false,
            needs_rotation: false,
            tokens: None,
        }
    }
}

/// Generate one 32-byte random token, hex encoded.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Mint a fresh session pair expiring `ttl_seconds` after `now`.
pub fn generate_session(ttl_seconds: i64, now: i64) -> SessionTokens {
    SessionTokens {
        token: generate_token(),
        refresh_token: generate_token(),
        expires_at: now + ttl_seconds,
    }
}

/// Evaluate a presented cookie against the stored pair. Pure over explicit
/// arguments; performs no I/O.
pub fn evaluate_session(
    cookie: &SessionCookie,
    stored: Option<&SessionTokens>,
    now: i64,
    ttl_seconds: i64,
) -> SessionVerdict {
    if cookie.token.is_empty() || cookie.refresh_token.is_empty() {
        debug!("session denied: empty cookie fields");
        return SessionVerdict::denied();
    }

    let stored = match stored {
        Some(s) => s,
        None => {
            debug!("session denied: no stored session");
            return SessionVerdict::denied();
        }
    };

    if stored.token.is_empty() || stored.refresh_token.is_empty() {
        debug!("session denied: stored session cleared");
        return SessionVerdict::denied();
    }

    if stored.expires_at >= now {
        // Idempotent read: the stored pair stays current.
        return SessionVerdict {
            verified: true,
            needs_rotation: false,
            tokens: Some(stored.clone()),
        };
    }

    if stored.refresh_token != cookie.refresh_token {
        debug!("session denied: refresh token mismatch");
        return SessionVerdict::denied();
    }

    debug!("session expired, minting rotated pair");
    SessionVerdict {
        verified: true,
        needs_rotation: true,
        tokens: Some(generate_session(ttl_seconds, now)),
    }
}

/// Outcome of [`verify_session`]: the verdict plus the identity row it was
/// evaluated against, when one was found.
#[derive(Debug, Clone)]
pub struct SessionCheck {
    pub verdict: SessionVerdict,
    pub identity: Option<Identity>,
}

impl SessionCheck {
    fn denied() -> Self {
        Self {
            verdict: SessionVerdict::denied(),
            identity: None,
        }
    }
}

/// Verify a presented cookie, looking the identity up by token unless a
/// cached record is supplied. The decision is returned; persisting a rotation
/// (via [`IdentityRepository::rotate_session`]) is the caller's job.
pub async fn verify_session<R: IdentityRepository + ?Sized>(
    repo: &R,
    cookie: &SessionCookie,
    cached: Option<Identity>,
    now: i64,
    ttl_seconds: i64,
) -> Result<SessionCheck> {
    if cookie.token.is_empty() {
        return Ok(SessionCheck::denied());
    }

    let identity = match cached {
        Some(identity) => Some(identity),
        None => repo.get_identity_by_token(&cookie.token).await?,
    };

    let verdict = evaluate_session(cookie, identity.as_ref().and_then(|i| i.session.as_ref()), now, ttl_seconds);
    Ok(SessionCheck { verdict, identity })
}
