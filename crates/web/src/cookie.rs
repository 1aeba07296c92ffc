//! The session cookie: a JSON `{token, refreshToken}` payload, HTTP-only and
//! cross-site, whose Max-Age deliberately outlives the server-side session
//! TTL so rotation-on-read can happen before the cookie disappears.

use axum::http::{header, HeaderMap};

use tether_core::models::identity::SessionTokens;
use tether_core::session::SessionCookie;

pub const SESSION_COOKIE_NAME: &str = "session";

/// Extract and parse the session cookie from request headers.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<SessionCookie> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
            let decoded = urlencoding::decode(value).ok()?;
            return serde_json::from_str(&decoded).ok();
        }
    }
    None
}

/// Build the Set-Cookie value carrying a session pair.
pub fn session_cookie_header(tokens: &SessionTokens, max_age_seconds: i64) -> String {
    let payload = serde_json::to_string(&SessionCookie {
        token: tokens.token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    })
    .expect("session cookie payload is serializable");
    format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; Secure; SameSite=None; Max-Age={max_age_seconds}",
        urlencoding::encode(&payload)
    )
}

/// Build the Set-Cookie value that clears the session cookie.
pub fn clear_cookie_header() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens {
            token: "tok".into(),
            refresh_token: "ref".into(),
            expires_at: 0,
        }
    }

    #[test]
    fn cookie_round_trips_through_headers() {
        let header_value = session_cookie_header(&tokens(), 3600);
        let cookie_part = header_value.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie_part.parse().unwrap());
        let parsed = extract_session_cookie(&headers).unwrap();
        assert_eq!(parsed.token, "tok");
        assert_eq!(parsed.refresh_token, "ref");
    }

    #[test]
    fn cookie_attributes_allow_cross_site_use() {
        let header_value = session_cookie_header(&tokens(), 3600);
        assert!(header_value.contains("HttpOnly"));
        assert!(header_value.contains("Secure"));
        assert!(header_value.contains("SameSite=None"));
        assert!(header_value.contains("Max-Age=3600"));
    }

    #[test]
    fn missing_or_foreign_cookies_are_none() {
        let headers = HeaderMap::new();
        assert!(extract_session_cookie(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "other=value".parse().unwrap());
        assert!(extract_session_cookie(&headers).is_none());
    }

    #[test]
    fn malformed_payload_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("{SESSION_COOKIE_NAME}=not-json").parse().unwrap(),
        );
        assert!(extract_session_cookie(&headers).is_none());
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert!(clear_cookie_header().contains("Max-Age=0"));
    }
}
