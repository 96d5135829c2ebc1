// Cache keys for API responses.
// Derived from the endpoint path and the canonical (sorted) parameter encoding.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::Params;

/// Key identifying a cached response.
///
/// Encoded as `endpoint?name=value&name=value` with parameters sorted by name.
/// Reserved characters inside components are percent-escaped so distinct
/// `(endpoint, params)` pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: &str, params: &Params) -> Self {
        let mut key = escape(endpoint, &['?']).into_owned();
        key.push('?');

        for (i, (name, value)) in params.to_query().iter().enumerate() {
            if i > 0 {
                key.push('&');
            }
            key.push_str(&escape(name, &['&', '=']));
            key.push('=');
            key.push_str(&escape(value, &['&', '=']));
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percent-escape `%` and the given reserved characters.
fn escape<'a>(component: &'a str, reserved: &[char]) -> Cow<'a, str> {
    if !component.contains(|c: char| c == '%' || reserved.contains(&c)) {
        return Cow::Borrowed(component);
    }

    let mut out = String::with_capacity(component.len() + 8);
    for c in component.chars() {
        if c == '%' || reserved.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
