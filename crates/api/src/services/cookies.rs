//! Session cookie helper.
//!
//! The browser only ever holds an opaque session id; everything else lives
//! in the server-side session store.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use crate::config::SessionConfig;

const COOKIE_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct CookieHelper {
    name: String,
    secure: bool,
    same_site: String,
    max_age_secs: i64,
}

impl CookieHelper {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.secure,
            same_site: config.same_site.clone(),
            max_age_secs: config.ttl_secs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set-Cookie value carrying a session id.
    pub fn build_session_cookie(&self, session_id: &str) -> String {
        let cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name, session_id, COOKIE_PATH, self.max_age_secs
        );
        self.with_attributes(cookie)
    }

    /// Set-Cookie value that removes the session cookie.
    pub fn build_clear_cookie(&self) -> String {
        let cookie = format!(
            "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.name, COOKIE_PATH
        );
        self.with_attributes(cookie)
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site));
        cookie
    }

    pub fn add_session_cookie(&self, headers: &mut HeaderMap, session_id: &str) {
        if let Ok(value) = HeaderValue::from_str(&self.build_session_cookie(session_id)) {
            headers.append(SET_COOKIE, value);
        }
    }

    pub fn add_clear_cookie(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_clear_cookie()) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Session id from the request's Cookie headers, if present.
    pub fn extract_session_id<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|header| header.split(';'))
            .map(str::trim)
            .find_map(|cookie| {
                let (name, value) = cookie.split_once('=')?;
                (name == self.name && !value.is_empty()).then_some(value)
            })
    }
}
