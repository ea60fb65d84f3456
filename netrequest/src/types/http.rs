use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use reqwest::Url;

/// Header name to value. Keys keep the case they were written in; use
/// [`has_header`] to look a name up the way HTTP does.
pub type Headers = BTreeMap<String, String>;

/// Whether `headers` sets `name`, ignoring ASCII case.
pub fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of a request, kept sorted by key.
///
/// A `None` value means "unset": the key is left out of the query string and
/// out of the request description.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct UrlParams(BTreeMap<String, Option<String>>);

impl UrlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key=value`, rendering the value with `Display`.
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Adds `key` only if `value` is set.
    pub fn with_opt<V: fmt::Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.0.insert(key.into(), value.map(|v| v.to_string()));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Set parameters in key order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
    }
}

/// A fully resolved outgoing call: what a [`Transport`](crate::transport::Transport)
/// actually sends, and what request handlers get to rewrite.
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl HttpCall {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Raw answer of a transport.
///
/// `status` is `None` when the transport had no response metadata; `body` is
/// `None` when nothing came back at all.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: Option<u16>,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: Some(status),
            headers: Headers::new(),
            body: Some(body.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_params_are_skipped() {
        let params = UrlParams::new()
            .with("b", 2)
            .with_opt::<i32>("c", None)
            .with("a", "x");
        let present: Vec<_> = params.present().collect();
        assert_eq!(present, vec![("a", "x"), ("b", "2")]);
        assert_eq!(params.get("c"), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers: Headers = [("Content-Type".to_string(), "text/plain".to_string())].into();
        assert!(has_header(&headers, "content-type"));
        assert!(has_header(&headers, "CONTENT-TYPE"));
        assert!(!has_header(&headers, "content-length"));
    }

    #[test]
    fn params_with_only_unset_values_are_empty() {
        let params = UrlParams::new().with_opt::<&str>("a", None);
        assert!(params.is_empty());
    }
}
