//! The boundary to the actual network client.
//!
//! Services in [`crate::service`] never talk to the network directly; they hand
//! a resolved [`HttpCall`] to a [`Transport`] (or a [`SocketConnector`] for
//! persistent connections).

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{HttpCall, HttpResponse};
use crate::BoxError;

mod mock_transport;
mod reqwest_transport;

pub use mock_transport::MockTransport;
pub use reqwest_transport::ReqwestTransport;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one call. `Err` means the transport itself failed; any status
    /// code, including errors, comes back as `Ok`.
    async fn send_http_request(&self, call: HttpCall) -> Result<HttpResponse, BoxError>;
}

/// A discrete message received on a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Binary(Bytes),
    Text(String),
}

/// Opens persistent connections, e.g. WebSockets.
#[async_trait]
pub trait SocketConnector: Send + Sync + 'static {
    async fn connect(&self, call: HttpCall) -> Result<Box<dyn SocketConnection>, BoxError>;
}

#[async_trait]
pub trait SocketConnection: Send + 'static {
    /// Waits for the next message. A closed connection is reported as an error.
    async fn receive(&mut self) -> Result<SocketMessage, BoxError>;

    async fn close(&mut self);
}
