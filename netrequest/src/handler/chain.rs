use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::handler::{RequestHandler, RequestId};
use crate::request::{AnyResponse, ErasedRequest};
use crate::types::HttpCall;
use crate::{BoxError, RequestResult};

/// Runs several [`RequestHandler`]s as one.
///
/// Notifications go to every handler in registration order. `on_modify` is a
/// pipeline: each handler gets the call produced by the previous one, and the
/// first failure stops the chain. With no handlers the call passes through
/// untouched.
///
/// Each handler's `on_modify` must resolve exactly once; a handler future that
/// never completes stalls the call.
#[derive(Clone)]
pub struct HandlerChain {
    handlers: Arc<[Arc<dyn RequestHandler>]>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Arc<dyn RequestHandler>>) -> Self {
        Self {
            handlers: handlers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[async_trait]
impl RequestHandler for HandlerChain {
    fn on_created(&self, id: RequestId, request: &ErasedRequest) {
        for handler in self.handlers.iter() {
            handler.on_created(id, request);
        }
    }

    async fn on_modify(
        &self,
        id: RequestId,
        request: &ErasedRequest,
        mut call: HttpCall,
    ) -> Result<HttpCall, BoxError> {
        for handler in self.handlers.iter() {
            call = handler.on_modify(id, request, call).await?;
        }
        Ok(call)
    }

    fn on_sent(&self, id: RequestId, request: &ErasedRequest) {
        for handler in self.handlers.iter() {
            handler.on_sent(id, request);
        }
    }

    fn on_completed(
        &self,
        id: RequestId,
        request: &ErasedRequest,
        result: &RequestResult<AnyResponse>,
    ) {
        for handler in self.handlers.iter() {
            handler.on_completed(id, request, result);
        }
    }
}
