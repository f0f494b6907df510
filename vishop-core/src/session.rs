//! Browser-like session state and credential resolution.
//!
//! The remote site checks `Referer` and a session cookie on every form, so the
//! client carries a [`SessionContext`] that evolves the way a browser's would:
//! each completed navigation moves the referer, each `Set-Cookie` updates the
//! cookie jar.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, USER_AGENT};
use tracing::{debug, info};

use crate::contract::Prompter;
use crate::error::{Result, VishopError};

pub const DEFAULT_USER_AGENT: &str = concat!("vishop/", env!("CARGO_PKG_VERSION"));

/// Body marker of the login page when too many attempts were made.
pub const RATE_LIMIT_MARKER: &str = "try again later";
/// Body marker of the page the login redirect lands on after bad credentials.
pub const AUTH_FAILED_MARKER: &str = "Authentication failed";

/// Header and cookie state owned by one client for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_agent: String,
    referer: Option<String>,
    cookies: BTreeMap<String, String>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl SessionContext {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            referer: None,
            cookies: BTreeMap::new(),
        }
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Record a completed navigation: the next request is sent from `url`.
    pub fn navigate(&mut self, url: &str) {
        debug!(referer = url, "Session referer updated");
        self.referer = Some(url.to_string());
    }

    /// Merge one `Set-Cookie` header value into the jar.
    ///
    /// Only the leading `name=value` pair is kept; attributes such as `Path` or
    /// `HttpOnly` are dropped. A malformed value is ignored.
    pub fn absorb_set_cookie(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                debug!(cookie = name.trim(), "Session cookie stored");
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
            _ => debug!(set_cookie, "Ignoring malformed Set-Cookie header"),
        }
    }

    /// Absorb every `Set-Cookie` header of a response.
    pub fn absorb_response_headers(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(reqwest::header::SET_COOKIE) {
            if let Ok(text) = value.to_str() {
                self.absorb_set_cookie(text);
            }
        }
    }

    /// `Cookie` header value for the current jar, if it holds anything.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Headers every request of this session must carry.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Some(value) = self
            .referer
            .as_deref()
            .and_then(|r| HeaderValue::from_str(r).ok())
        {
            headers.insert(REFERER, value);
        }
        if let Some(value) = self
            .cookie_header()
            .and_then(|c| HeaderValue::from_str(&c).ok())
        {
            headers.insert(COOKIE, value);
        }
        headers
    }
}

/// Resolved login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fill in missing credentials, prompting only when running interactively.
///
/// Without a terminal a missing username or password is a [`VishopError::Credential`];
/// this check runs before anything touches the network.
pub fn authenticate<P>(
    username: Option<String>,
    password: Option<String>,
    interactive: bool,
    prompter: &P,
) -> Result<Credentials>
where
    P: Prompter + ?Sized,
{
    let username = username.filter(|u| !u.is_empty());
    let password = password.filter(|p| !p.is_empty());

    if !interactive && (username.is_none() || password.is_none()) {
        return Err(VishopError::Credential(
            "username or password required".into(),
        ));
    }

    let username = match username {
        Some(username) => username,
        None => prompter.input("username or email")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompter.password("password")?,
    };
    info!(username = %username, "Credentials resolved");
    Ok(Credentials { username, password })
}

/// Classify the response to the login form post.
///
/// A redirect carries the session; anything else is a failure whose kind is
/// read from the body.
pub fn check_login_response(status: u16, body: &str) -> Result<()> {
    match status {
        300..=399 => Ok(()),
        200 if body.contains(RATE_LIMIT_MARKER) => {
            Err(VishopError::RateLimit(body.trim().to_string()))
        }
        200 => Err(VishopError::UnexpectedResponse(
            "login form returned a page instead of redirecting".into(),
        )),
        other => Err(VishopError::UnexpectedResponse(format!(
            "login returned status {other}"
        ))),
    }
}

/// Check the page the login redirect led to.
pub fn check_login_landing(body: &str) -> Result<()> {
    if body.contains(AUTH_FAILED_MARKER) {
        return Err(VishopError::Authentication);
    }
    Ok(())
}
