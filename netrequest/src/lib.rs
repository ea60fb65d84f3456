//! Typed, declarative API requests on top of a pluggable HTTP/WebSocket transport.
//!
//! A call is described as a value implementing [`Request`](request::Request).
//! Any [`NetworkService`](service::NetworkService) can execute it:
//!
//! - [`HttpNetworkService`](service::HttpNetworkService) runs the call through a
//!   [`HandlerChain`](handler::HandlerChain) and a [`Transport`](transport::Transport).
//! - [`MockNetworkService`](service::MockNetworkService) answers from canned results.
//! - [`NetworkServiceGroup`](service::NetworkServiceGroup) tries several services in
//!   order, moving on whenever one answers [`RequestError::NoResponse`].

use thiserror::Error;

pub mod builder;
pub mod codec;
pub mod error;
pub mod executor;
pub mod handler;
pub mod request;
pub mod service;
pub mod stream;
pub mod transport;
pub mod types;

pub use error::{BoxError, RequestError, RequestResult, SharedError};
pub use request::Request;
pub use service::{NetworkService, NetworkServiceExt};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring a service, as opposed to the per-call
/// [`RequestError`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Client error: {0}")]
    Client(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
