//! Session cookie management

use super::{SameSitePolicy, SecureMode};
use http::header::COOKIE;
use http::{HeaderMap, Request};
use std::time::Duration;

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Cookie path
    pub path: String,

    /// Secure flag policy
    pub secure: SecureMode,

    /// HttpOnly flag (no JavaScript access)
    pub http_only: bool,

    /// SameSite policy, omitted when `None`
    pub same_site: Option<SameSitePolicy>,

    /// Cookie and record lifetime; zero makes a browser-session cookie
    pub max_age: Duration,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "sess".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: SecureMode::Prefer,
            http_only: true,
            same_site: Some(SameSitePolicy::Lax),
            max_age: Duration::from_secs(86400), // 24 hours
        }
    }
}

/// Session cookie builder
#[derive(Debug, Clone)]
pub struct SessionCookie {
    config: CookieConfig,
}

impl SessionCookie {
    /// Create a new session cookie builder
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Whether responses to `req` get the Secure attribute
    pub fn is_secure<B>(&self, req: &Request<B>) -> bool {
        match self.config.secure {
            SecureMode::Never => false,
            SecureMode::Always => true,
            SecureMode::Prefer => is_tls(req),
        }
    }

    /// Build a Set-Cookie header value carrying `session_id`
    pub fn build_set_cookie(&self, session_id: &str, secure: bool) -> String {
        let mut parts = vec![format!("{}={}", self.config.name, session_id)];

        if !self.config.max_age.is_zero() {
            // sub-second ages round up; Max-Age=0 would delete the cookie
            parts.push(format!("Max-Age={}", self.config.max_age.as_secs().max(1)));
        }

        self.push_attributes(&mut parts, secure);
        parts.join("; ")
    }

    /// Build a Set-Cookie header value that clears the cookie
    pub fn build_delete_cookie(&self, secure: bool) -> String {
        let mut parts = vec![
            format!("{}=", self.config.name),
            "Max-Age=0".to_string(),
            "Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
        ];
        self.push_attributes(&mut parts, secure);
        parts.join("; ")
    }

    fn push_attributes(&self, parts: &mut Vec<String>, secure: bool) {
        if let Some(ref domain) = self.config.domain {
            parts.push(format!("Domain={}", domain));
        }

        if !self.config.path.is_empty() {
            parts.push(format!("Path={}", self.config.path));
        }

        if secure {
            parts.push("Secure".to_string());
        }

        if self.config.http_only {
            parts.push("HttpOnly".to_string());
        }

        if let Some(same_site) = self.config.same_site {
            let same_site = match same_site {
                SameSitePolicy::Strict => "Strict",
                SameSitePolicy::Lax => "Lax",
                SameSitePolicy::None => "None",
            };
            parts.push(format!("SameSite={}", same_site));
        }
    }

    /// Extract the session id from the request's Cookie headers
    ///
    /// Empty values count as absent.
    pub fn extract_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| self.extract_from_header(header))
    }

    /// Extract the session id from one Cookie header value
    pub fn extract_from_header(&self, cookie_header: &str) -> Option<String> {
        cookie_header.split(';').find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            if name.trim() != self.config.name {
                return None;
            }
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        })
    }
}

/// TLS either on the connection itself or terminated by a proxy
fn is_tls<B>(req: &Request<B>) -> bool {
    if req.uri().scheme_str() == Some("https") {
        return true;
    }
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}
