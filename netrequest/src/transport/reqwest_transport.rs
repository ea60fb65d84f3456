#[cfg(feature = "tracing")]
use tracing::instrument;

use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::transport::Transport;
use crate::types::{Headers, HttpCall, HttpMethod, HttpResponse};
use crate::{BoxError, Result};

/// A [`Transport`] backed by `reqwest`.
///
/// This is what [`HttpNetworkService`](crate::service::HttpNetworkService) uses
/// when no other transport is configured. Status codes are passed through
/// as-is; deciding which ones are failures is up to each request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Transport`](crate::Error::Transport) if the client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Uses an already configured client (timeouts, proxies, TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::GET => Method::GET,
        HttpMethod::POST => Method::POST,
        HttpMethod::PUT => Method::PUT,
        HttpMethod::DELETE => Method::DELETE,
        HttpMethod::PATCH => Method::PATCH,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[cfg_attr(
        feature = "tracing",
        instrument(skip(self, call), fields(method = %call.method, url = %call.url))
    )]
    async fn send_http_request(
        &self,
        call: HttpCall,
    ) -> std::result::Result<HttpResponse, BoxError> {
        let mut request_builder = self.client.request(to_reqwest_method(call.method), call.url);

        for (name, value) in &call.headers {
            request_builder = request_builder.header(name, value);
        }

        if let Some(body) = call.body {
            request_builder = request_builder.body(body);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<Headers>();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status: Some(status),
            headers,
            body: Some(body),
        })
    }
}
