//! Observers and mutators of a call's lifecycle.
//!
//! For one call the hooks fire in the order
//! `on_created -> on_modify -> on_sent -> on_completed`. `on_sent` is skipped
//! when `on_modify` fails.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::request::{AnyResponse, ErasedRequest};
use crate::types::HttpCall;
use crate::{BoxError, RequestResult};

mod chain;

pub use chain::HandlerChain;

/// Identifies one call across all of its lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Hooks into the lifecycle of every call made by an
/// [`HttpNetworkService`](crate::service::HttpNetworkService).
///
/// All hooks have no-op defaults, so implementors only override what they need.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Called once, right after the call is started and before any transport work.
    fn on_created(&self, _id: RequestId, _request: &ErasedRequest) {}

    /// Validates and rewrites the outgoing call, e.g. to add auth headers.
    /// Returning an error vetoes the call with
    /// [`RequestError::Handler`](crate::RequestError::Handler).
    async fn on_modify(
        &self,
        _id: RequestId,
        _request: &ErasedRequest,
        call: HttpCall,
    ) -> Result<HttpCall, BoxError> {
        Ok(call)
    }

    /// Called once, right after the call was handed to the transport. The
    /// transport has been polled once by then, so the call was dispatched, but
    /// no response has been awaited yet.
    fn on_sent(&self, _id: RequestId, _request: &ErasedRequest) {}

    /// Called with the final, type-erased result before the caller sees it.
    fn on_completed(
        &self,
        _id: RequestId,
        _request: &ErasedRequest,
        _result: &RequestResult<AnyResponse>,
    ) {
    }
}
