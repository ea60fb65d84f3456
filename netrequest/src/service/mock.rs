use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::instrument;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::request::{AnyResponse, ErasedRequest};
use crate::service::{Completion, MessageHandler, NetworkService, RequestHandle};
use crate::{Request, RequestError, RequestResult};

type Canned = Arc<dyn Fn() -> RequestResult<AnyResponse> + Send + Sync>;
type Responder = Arc<dyn Fn(&ErasedRequest) -> Option<RequestResult<AnyResponse>> + Send + Sync>;

/// Answers requests from mocks registered ahead of time.
///
/// Lookup order for every call:
/// 1. an exact mock registered for a request with the same
///    [`description`](Request::description) (the last registration wins),
/// 2. dynamic mocks registered for the request's type, in registration order;
///    the first one that returns `Some` answers,
/// 3. otherwise [`RequestError::NoResponse`].
///
/// Calls complete synchronously, inside `dispatch`, and never return a handle.
///
/// Clones share their tables. The tables are meant to be set up before
/// requests are made; registering mocks while calls are in flight gives no
/// ordering guarantee between the two.
#[derive(Clone, Default)]
pub struct MockNetworkService {
    exact: Arc<RwLock<HashMap<String, Canned>>>,
    dynamic: Arc<RwLock<HashMap<TypeId, Vec<Responder>>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn erase<T: Send + 'static>(result: RequestResult<T>) -> RequestResult<AnyResponse> {
    result.map(|value| Box::new(value) as AnyResponse)
}

impl MockNetworkService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests described like `request` with `result`.
    pub fn mock<R>(&self, request: &R, result: RequestResult<R::Response>)
    where
        R: Request,
        R::Response: Clone + Sync,
    {
        write(&self.exact).insert(
            request.description(),
            Arc::new(move || erase(result.clone())),
        );
    }

    /// Decodes `data` with `request`'s own decoder, as a 200 response, and
    /// answers requests described like `request` with the outcome.
    pub fn mock_data<R>(&self, request: &R, data: impl Into<Bytes>)
    where
        R: Request,
        R::Response: Clone + Sync,
    {
        self.mock_data_with_status(request, data, 200);
    }

    /// Like [`mock_data`](Self::mock_data) with an explicit status code.
    /// Decoding happens now; a failure is stored as a
    /// [`RequestError::Decoding`] answer.
    pub fn mock_data_with_status<R>(&self, request: &R, data: impl Into<Bytes>, status: u16)
    where
        R: Request,
        R::Response: Clone + Sync,
    {
        let data = data.into();
        let result = request
            .decode_response(&data, status)
            .map_err(RequestError::decoding);
        self.mock(request, result);
    }

    /// Answers every request of type `R` with `result`.
    pub fn mock_type<R>(&self, result: RequestResult<R::Response>)
    where
        R: Request,
        R::Response: Clone + Sync,
    {
        self.mock_fn(move |_: &R| Some(result.clone()));
    }

    /// Lets `responder` decide for each request of type `R`. Returning `None`
    /// passes the request on to the next responder.
    pub fn mock_fn<R, F>(&self, responder: F)
    where
        R: Request,
        F: Fn(&R) -> Option<RequestResult<R::Response>> + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(move |request: &ErasedRequest| {
            request
                .downcast_ref::<R>()
                .and_then(|request| responder(request))
                .map(erase)
        });
        write(&self.dynamic)
            .entry(TypeId::of::<R>())
            .or_default()
            .push(responder);
    }

    /// Removes every exact and dynamic mock.
    pub fn unmock_all(&self) {
        write(&self.exact).clear();
        write(&self.dynamic).clear();
    }

    /// The answer this service gives to `request`.
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(request = %request.description())))]
    pub fn respond(&self, request: &ErasedRequest) -> RequestResult<AnyResponse> {
        #[cfg(feature = "metrics")]
        counter!("netrequest.requests_total", "service" => "mock").increment(1);

        let exact = read(&self.exact).get(&request.description()).cloned();
        if let Some(canned) = exact {
            return canned();
        }

        let responders = read(&self.dynamic)
            .get(&request.request_type())
            .cloned()
            .unwrap_or_default();
        responders
            .iter()
            .find_map(|responder| responder(request))
            .unwrap_or(Err(RequestError::NoResponse))
    }
}

impl fmt::Debug for MockNetworkService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockNetworkService")
            .field("exact", &read(&self.exact).len())
            .field("dynamic", &read(&self.dynamic).len())
            .finish()
    }
}

impl NetworkService for MockNetworkService {
    fn dispatch(
        &self,
        request: ErasedRequest,
        _token: CancellationToken,
        completion: Completion,
    ) -> Option<RequestHandle> {
        completion(self.respond(&request));
        None
    }

    /// Delivers the mocked answer as the socket's only message.
    fn open_socket(
        &self,
        request: ErasedRequest,
        _token: CancellationToken,
        on_message: MessageHandler,
    ) -> Option<RequestHandle> {
        on_message(self.respond(&request));
        None
    }
}
