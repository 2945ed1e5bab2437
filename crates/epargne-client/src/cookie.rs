//! Cookie persistence of the credential pair.

use std::{
    fmt::Display,
    sync::{Mutex, PoisonError},
};

use fnv::FnvHashMap;
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime};

/// Cookie holding the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "jwt";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_jwt";

const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// The SameSite cookie attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// Only sent on same-site requests.
    Strict,
    /// Sent on top-level navigations too.
    Lax,
    /// Always sent.
    None,
}

impl Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

/// A cookie with the attributes the client cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Path attribute.
    pub path: String,
    /// SameSite attribute.
    pub same_site: SameSite,
    /// Secure attribute.
    pub secure: bool,
    /// Expiry. `None` is a session cookie.
    pub expires: Option<OffsetDateTime>,
}

impl Cookie {
    /// A session cookie scoped to `/` with `SameSite=Strict`.
    pub fn new(name: impl Into<String>, value: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            same_site: SameSite::Strict,
            secure,
            expires: None,
        }
    }

    /// The cookie that removes `name`: empty, expiring at the Unix epoch.
    pub fn expired(name: impl Into<String>, secure: bool) -> Self {
        Self {
            expires: Some(OffsetDateTime::UNIX_EPOCH),
            ..Self::new(name, "", secure)
        }
    }

    /// Whether the cookie is expired at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.map(|expires| expires <= now).unwrap_or(false)
    }

    /// Parse a line previously produced by the [Display] implementation.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value, false);
        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.to_ascii_lowercase().as_str() {
                "path" => cookie.path = val.to_string(),
                "secure" => cookie.secure = true,
                "samesite" => {
                    cookie.same_site = match val.to_ascii_lowercase().as_str() {
                        "lax" => SameSite::Lax,
                        "none" => SameSite::None,
                        _ => SameSite::Strict,
                    }
                }
                "expires" => {
                    cookie.expires = time::PrimitiveDateTime::parse(val, HTTP_DATE)
                        .ok()
                        .map(|expires| expires.assume_utc());
                }
                _ => {}
            }
        }

        Some(cookie)
    }
}

impl Display for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        write!(f, "; SameSite={}", self.same_site)?;
        if self.secure {
            write!(f, "; Secure")?;
        }
        if let Some(expires) = self.expires {
            let expires = expires.format(HTTP_DATE).map_err(|_| std::fmt::Error)?;
            write!(f, "; Expires={expires}")?;
        }

        Ok(())
    }
}

/// Storage for cookies.
///
/// Writes are best effort: implementations swallow their own failures.
pub trait CookieJar: Send + Sync {
    /// Read the value of a live cookie.
    fn get(&self, name: &str) -> Option<String>;

    /// Write a cookie. Writing an expired cookie removes it.
    fn set(&self, cookie: Cookie);
}

/// An in-process cookie jar.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<FnvHashMap<String, Cookie>>,
}

impl MemoryCookieJar {
    /// Rehydrate a jar from lines produced by [MemoryCookieJar::lines].
    pub fn load_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let jar = Self::default();
        for cookie in lines.into_iter().filter_map(Cookie::parse) {
            jar.set(cookie);
        }
        jar
    }

    /// The live cookies rendered as `Set-Cookie` style lines, sorted by name.
    pub fn lines(&self) -> Vec<String> {
        let now = OffsetDateTime::now_utc();
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        let mut lines: Vec<_> = cookies
            .values()
            .filter(|cookie| !cookie.is_expired_at(now))
            .map(|cookie| (cookie.name.clone(), cookie.to_string()))
            .collect();
        lines.sort();
        lines.into_iter().map(|(_, line)| line).collect()
    }

    /// Get the full cookie, attributes included.
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|cookie| !cookie.is_expired_at(OffsetDateTime::now_utc()))
            .cloned()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|cookie| cookie.value)
    }

    fn set(&self, cookie: Cookie) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if cookie.is_expired_at(OffsetDateTime::now_utc()) {
            cookies.remove(&cookie.name);
        } else {
            cookies.insert(cookie.name.clone(), cookie);
        }
    }
}
