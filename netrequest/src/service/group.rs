use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::debug;

use tokio_util::sync::CancellationToken;

use crate::request::{AnyResponse, ErasedRequest};
use crate::service::{Completion, MessageHandler, NetworkService, RequestHandle};
use crate::{RequestError, RequestResult};

/// Tries a list of services in order.
///
/// A service that answers [`RequestError::NoResponse`] passes the request on
/// to the next one; any other outcome is final. When the last service also
/// answers `NoResponse`, that is the result. An empty group answers
/// `NoResponse` straight away.
///
/// The usual setup is a [`MockNetworkService`](crate::service::MockNetworkService)
/// in front of an [`HttpNetworkService`](crate::service::HttpNetworkService), so
/// mocked requests never reach the network.
#[derive(Clone)]
pub struct NetworkServiceGroup {
    services: Arc<[Arc<dyn NetworkService>]>,
}

impl NetworkServiceGroup {
    pub fn new(services: Vec<Arc<dyn NetworkService>>) -> Self {
        Self {
            services: services.into(),
        }
    }

    pub fn services(&self) -> &[Arc<dyn NetworkService>] {
        &self.services
    }
}

impl fmt::Debug for NetworkServiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkServiceGroup")
            .field("services", &self.services.len())
            .finish()
    }
}

impl NetworkService for NetworkServiceGroup {
    fn dispatch(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        completion: Completion,
    ) -> Option<RequestHandle> {
        if self.services.is_empty() {
            completion(Err(RequestError::NoResponse));
            return None;
        }
        let finished = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&finished);
        dispatch_from(
            Arc::clone(&self.services),
            0,
            request,
            token.clone(),
            Box::new(move |result: RequestResult<AnyResponse>| {
                done.store(true, Ordering::SeqCst);
                completion(result);
            }),
        );
        if finished.load(Ordering::SeqCst) {
            None
        } else {
            Some(RequestHandle::new(token))
        }
    }

    /// Falls through on `NoResponse` messages the same way as `dispatch`; the
    /// abandoned service's socket is cancelled before the next one is opened.
    /// Returns a handle only while the service that took over keeps its
    /// socket open.
    fn open_socket(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        on_message: MessageHandler,
    ) -> Option<RequestHandle> {
        if self.services.is_empty() {
            on_message(Err(RequestError::NoResponse));
            return None;
        }
        let live = Arc::new(AtomicBool::new(false));
        open_from(
            Arc::clone(&self.services),
            0,
            request,
            token.clone(),
            on_message,
            Arc::clone(&live),
        );
        if live.load(Ordering::SeqCst) {
            Some(RequestHandle::new(token))
        } else {
            None
        }
    }
}

fn has_next(services: &[Arc<dyn NetworkService>], index: usize, token: &CancellationToken) -> bool {
    index + 1 < services.len() && !token.is_cancelled()
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn fall_through(index: usize) {
    #[cfg(feature = "metrics")]
    counter!("netrequest.group_fallthrough_total").increment(1);
    #[cfg(feature = "tracing")]
    debug!(index, "service did not handle the request, trying the next one");
}

fn dispatch_from(
    services: Arc<[Arc<dyn NetworkService>]>,
    index: usize,
    request: ErasedRequest,
    token: CancellationToken,
    completion: Completion,
) {
    let Some(service) = services.get(index).cloned() else {
        completion(Err(RequestError::NoResponse));
        return;
    };
    let child = token.child_token();
    service.dispatch(
        request.clone(),
        child,
        Box::new(move |result: RequestResult<AnyResponse>| match result {
            Err(RequestError::NoResponse) if has_next(&services, index, &token) => {
                fall_through(index);
                dispatch_from(services, index + 1, request, token, completion);
            }
            result => completion(result),
        }),
    );
}

fn open_from(
    services: Arc<[Arc<dyn NetworkService>]>,
    index: usize,
    request: ErasedRequest,
    token: CancellationToken,
    on_message: MessageHandler,
    live: Arc<AtomicBool>,
) {
    let Some(service) = services.get(index).cloned() else {
        live.store(false, Ordering::SeqCst);
        on_message(Err(RequestError::NoResponse));
        return;
    };
    let child = token.child_token();
    let abandoned = Arc::new(AtomicBool::new(false));

    let forward: MessageHandler = {
        let request = request.clone();
        let child = child.clone();
        let abandoned = Arc::clone(&abandoned);
        let live = Arc::clone(&live);
        Arc::new(move |result: RequestResult<AnyResponse>| {
            if abandoned.load(Ordering::SeqCst) {
                return;
            }
            match result {
                Err(RequestError::NoResponse) if has_next(&services, index, &token) => {
                    if abandoned.swap(true, Ordering::SeqCst) {
                        return;
                    }
                    child.cancel();
                    fall_through(index);
                    open_from(
                        Arc::clone(&services),
                        index + 1,
                        request.clone(),
                        token.clone(),
                        Arc::clone(&on_message),
                        Arc::clone(&live),
                    );
                }
                result => on_message(result),
            }
        })
    };
    let handle = service.open_socket(request, child, forward);
    // a fall-through already recorded whether the next service stays open
    if !abandoned.load(Ordering::SeqCst) {
        live.store(handle.is_some(), Ordering::SeqCst);
    }
}
