use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use reqwest::Url;

use crate::executor::CompletionExecutor;
use crate::handler::{HandlerChain, RequestHandler};
use crate::service::HttpNetworkService;
use crate::transport::{ReqwestTransport, SocketConnector, Transport};
use crate::types::{has_header, Headers};
use crate::{Error, Result};

/// A builder for constructing an [`HttpNetworkService`].
///
/// - Uses either the `NETREQUEST_BASE_URL` environment variable or no base URL,
///   in which case every request must supply an absolute URL itself.
/// - Uses either the `NETREQUEST_BEARER_TOKEN` environment variable or nothing.
///   A token becomes a default `Authorization: Bearer ...` header.
/// - Starts with no handlers and no default headers.
/// - Uses `reqwest`-based transport by default - [`ReqwestTransport`].
/// - Has no socket connector by default, so sockets answer
///   [`RequestError::NoResponse`](crate::RequestError::NoResponse).
/// - Runs completions immediately on the task that produced them.
pub struct HttpNetworkServiceBuilder {
    base_url: Option<String>,
    bearer_token: Option<String>,
    headers: Headers,
    handlers: Vec<Arc<dyn RequestHandler>>,
    transport: Option<Arc<dyn Transport>>,
    socket_connector: Option<Arc<dyn SocketConnector>>,
    completion: CompletionExecutor,
}

impl HttpNetworkServiceBuilder {
    /// Creates a new [`HttpNetworkServiceBuilder`]. This method is called by
    /// [`HttpNetworkService::builder`].
    pub(crate) fn new() -> Self {
        HttpNetworkServiceBuilder {
            base_url: None,
            bearer_token: None,
            headers: Headers::new(),
            handlers: Vec::new(),
            transport: None,
            socket_connector: None,
            completion: CompletionExecutor::default(),
        }
    }

    /// Sets the prefix put in front of every request's own base URL and path.
    ///
    /// If not set, the builder will try to read from the `NETREQUEST_BASE_URL`
    /// environment variable.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent with every request, unless the request sets the
    /// same header itself.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a bearer token sent as the default `Authorization` header.
    ///
    /// If not set, the builder will try to read from the `NETREQUEST_BEARER_TOKEN`
    /// environment variable. An explicit `Authorization` header takes precedence.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Appends a handler to the chain. Handlers run in the order they were added.
    pub fn handler(mut self, handler: impl RequestHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn handlers(
        mut self,
        handlers: impl IntoIterator<Item = Arc<dyn RequestHandler>>,
    ) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Sets a custom transport implementation for the service.
    ///
    /// If not set, a `reqwest`-based transport \([`ReqwestTransport`]\) will be used.
    /// For testing, you can use [`MockTransport`](crate::transport::MockTransport)
    /// or your own [`Transport`] implementation.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets what opens the persistent connections used by sockets.
    pub fn socket_connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.socket_connector = Some(connector);
        self
    }

    /// Sets where `on_completed` handlers and completions run.
    pub fn completion_executor(mut self, executor: CompletionExecutor) -> Self {
        self.completion = executor;
        self
    }

    /// Builds the [`HttpNetworkService`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`](variant@Error::Client) if the base URL is not
    /// a valid URL, or an [`Error::Transport`](variant@Error::Transport) if the
    /// default [`ReqwestTransport`] cannot be initialized.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn build(self) -> Result<HttpNetworkService> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("NETREQUEST_BASE_URL").ok());
        if let Some(base_url) = &base_url {
            Url::parse(base_url).map_err(|e| Error::Client(format!("Invalid base URL: {}", e)))?;
        }

        let mut headers = self.headers;
        let bearer_token = self
            .bearer_token
            .or_else(|| std::env::var("NETREQUEST_BEARER_TOKEN").ok());
        if let Some(token) = bearer_token {
            if !has_header(&headers, "Authorization") {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
        }

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(HttpNetworkService::from_parts(
            base_url,
            headers,
            HandlerChain::new(self.handlers),
            transport,
            self.socket_connector,
            self.completion,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn rejects_invalid_base_url() {
        let result = HttpNetworkServiceBuilder::new()
            .base_url("not a url")
            .transport(Arc::new(MockTransport::new()))
            .build();
        assert!(matches!(
            result,
            Err(Error::Client(message)) if message.starts_with("Invalid base URL")
        ));
    }

    #[test]
    fn bearer_token_does_not_replace_explicit_authorization() {
        let service = HttpNetworkServiceBuilder::new()
            .base_url("https://example.com")
            .header("Authorization", "Basic abc")
            .bearer_token("secret")
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();
        assert_eq!(service.headers().get("Authorization").unwrap(), "Basic abc");
    }

    #[test]
    fn bearer_token_respects_authorization_in_any_case() {
        let service = HttpNetworkServiceBuilder::new()
            .base_url("https://example.com")
            .header("authorization", "Basic abc")
            .bearer_token("secret")
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();
        assert_eq!(service.headers().len(), 1);
        assert_eq!(service.headers().get("authorization").unwrap(), "Basic abc");
    }

    #[test]
    fn bearer_token_becomes_authorization_header() {
        let service = HttpNetworkServiceBuilder::new()
            .base_url("https://example.com")
            .bearer_token("secret")
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();
        assert_eq!(service.headers().get("Authorization").unwrap(), "Bearer secret");
        assert_eq!(service.base_url(), Some("https://example.com"));
    }
}
