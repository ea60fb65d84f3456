//! Declarative description of a single API call.

use bytes::Bytes;
use reqwest::Url;

use crate::types::{Headers, HttpCall, HttpMethod, UrlParams};
use crate::{BoxError, RequestError, RequestResult};

mod erased;

pub use erased::{AnyRequest, AnyResponse, ErasedRequest};

/// Implemented by each concrete API call.
///
/// Only [`path`](Request::path) and [`decode_response`](Request::decode_response)
/// are required. A request value is treated as immutable: every derived value
/// (URL, description, outgoing call) is computed from it on demand.
///
/// ```
/// use bytes::Bytes;
/// use netrequest::codec::{Codec, JsonCodec};
/// use netrequest::types::UrlParams;
/// use netrequest::{BoxError, Request};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Post {
///     id: u64,
///     title: String,
/// }
///
/// struct GetPosts {
///     user_id: u64,
/// }
///
/// impl Request for GetPosts {
///     type Response = Vec<Post>;
///
///     fn path(&self) -> String {
///         "/posts".into()
///     }
///
///     fn url_params(&self) -> UrlParams {
///         UrlParams::new().with("userId", self.user_id)
///     }
///
///     fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Vec<Post>, BoxError> {
///         JsonCodec.decode(body)
///     }
/// }
///
/// assert_eq!(GetPosts { user_id: 2 }.description(), "GetPosts: GET /posts userId: 2");
/// ```
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;

    /// Path of the call, e.g. `/pets`.
    fn path(&self) -> String;

    /// Prepended to [`path`](Request::path). The service's own base URL is
    /// prepended in front of this one.
    fn base_url(&self) -> String {
        String::new()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::GET
    }

    fn headers(&self) -> Headers {
        Headers::new()
    }

    fn url_params(&self) -> UrlParams {
        UrlParams::new()
    }

    /// Defaults to the type name without its module path.
    fn request_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Status codes for which the body is decoded. Anything else is an
    /// [`RequestError::Api`]. Defaults to 2xx and 3xx.
    fn valid_status_code(&self, status: u16) -> bool {
        (200..400).contains(&status)
    }

    fn decode_response(&self, body: &Bytes, status: u16) -> Result<Self::Response, BoxError>;

    /// Body to send. `None` (the default) sends no body.
    fn encode_body(&self) -> Result<Option<Bytes>, BoxError> {
        Ok(None)
    }

    /// Identity of the call, used as the key for exact mocks:
    /// `"{request_name}: {method} {path} {params}"` with the set parameters
    /// sorted by key and rendered as `key: value`.
    fn description(&self) -> String {
        describe(
            &self.request_name(),
            self.method(),
            &self.path(),
            &self.url_params(),
        )
    }

    /// Builds the outgoing call, with `prefix` (usually the service base URL)
    /// put in front of the request's own URL.
    ///
    /// # Panics
    ///
    /// Panics if the concatenated URL does not parse. That is a configuration
    /// mistake, not something to recover from at runtime.
    fn build_call(&self, prefix: &str) -> RequestResult<HttpCall> {
        let url = resolve_url(prefix, &self.base_url(), &self.path(), &self.url_params());
        let body = self.encode_body().map_err(RequestError::encoding)?;
        Ok(HttpCall {
            method: self.method(),
            url,
            headers: self.headers(),
            body,
        })
    }
}

pub(crate) fn describe(name: &str, method: HttpMethod, path: &str, params: &UrlParams) -> String {
    let params = params
        .present()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {} {} {}", name, method, path, params)
}

/// Joins `prefix`, `base_url` and `path`, then appends the set parameters as
/// the query string.
///
/// # Panics
///
/// Panics if the joined string is not a valid absolute URL.
pub fn resolve_url(prefix: &str, base_url: &str, path: &str, params: &UrlParams) -> Url {
    let raw = format!("{}{}{}", prefix, base_url, path);
    let mut url = match Url::parse(&raw) {
        Ok(url) => url,
        Err(err) => panic!("invalid request url {:?}: {}", raw, err),
    };
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in params.present() {
            query.append_pair(key, value);
        }
    }
    url
}

// `a::b::Item<c::D>` -> `Item<D>`
fn short_type_name(full: &str) -> String {
    let mut name = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                name.push_str(segment.rsplit("::").next().unwrap_or_default());
                segment.clear();
                name.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    name.push_str(segment.rsplit("::").next().unwrap_or_default());
    name
}
