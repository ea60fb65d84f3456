//! Services that execute requests.
//!
//! [`NetworkService`] is the object-safe core every service implements, so
//! services can be stored and composed as `Arc<dyn NetworkService>`.
//! [`NetworkServiceExt`] layers the typed API on top of it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::request::{AnyResponse, ErasedRequest};
use crate::stream::ResponseStream;
use crate::{Request, RequestError, RequestResult};

mod group;
mod http;
mod mock;

pub use group::NetworkServiceGroup;
pub use http::HttpNetworkService;
pub use mock::MockNetworkService;

/// Receives the outcome of a single call, exactly once.
pub type Completion = Box<dyn FnOnce(RequestResult<AnyResponse>) + Send + 'static>;

/// Receives each message of a socket, in the order they arrive.
pub type MessageHandler = Arc<dyn Fn(RequestResult<AnyResponse>) + Send + Sync + 'static>;

/// Executes requests against some backend: a real transport, a table of mocks,
/// or a group of other services.
pub trait NetworkService: Send + Sync + 'static {
    /// Starts `request` and reports the outcome to `completion`.
    ///
    /// Cancelling `token` aborts the call on a best-effort basis. A completion
    /// that was already scheduled when the token was cancelled may still run.
    ///
    /// Returns a handle when the call may still be in flight, `None` when it
    /// already completed.
    fn dispatch(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        completion: Completion,
    ) -> Option<RequestHandle>;

    /// Opens a persistent connection for `request` and reports every message
    /// to `on_message` until `token` is cancelled or the connection fails.
    ///
    /// Returns a handle while the socket may still be open, `None` when it
    /// already ended.
    fn open_socket(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        on_message: MessageHandler,
    ) -> Option<RequestHandle>;
}

/// Cancels an in-flight call.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    token: CancellationToken,
}

impl RequestHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Aborts the call if it is still running. Safe to call repeatedly, from
    /// any thread, and after completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Typed API over any [`NetworkService`].
pub trait NetworkServiceExt: NetworkService {
    /// Runs `request` and calls `completion` with its typed result.
    fn make_request<R, F>(&self, request: R, completion: F) -> Option<RequestHandle>
    where
        R: Request,
        F: FnOnce(RequestResult<R::Response>) + Send + 'static,
    {
        self.dispatch(
            ErasedRequest::new(request),
            CancellationToken::new(),
            Box::new(move |result: RequestResult<AnyResponse>| {
                completion(downcast_result(result))
            }),
        )
    }

    /// Opens a socket for `request`; `on_message` gets every decoded message.
    fn start_socket<R, F>(&self, request: R, on_message: F) -> Option<RequestHandle>
    where
        R: Request,
        F: Fn(RequestResult<R::Response>) + Send + Sync + 'static,
    {
        self.open_socket(
            ErasedRequest::new(request),
            CancellationToken::new(),
            Arc::new(move |result: RequestResult<AnyResponse>| {
                on_message(downcast_result(result))
            }),
        )
    }

    /// Runs `request`; dropping the returned future cancels the call.
    fn send<R: Request>(&self, request: R) -> ResponseFuture<R::Response> {
        let (sender, receiver) = oneshot::channel();
        let token = CancellationToken::new();
        self.dispatch(
            ErasedRequest::new(request),
            token.clone(),
            Box::new(move |result: RequestResult<AnyResponse>| {
                let _ = sender.send(downcast_result(result));
            }),
        );
        ResponseFuture {
            receiver,
            _guard: token.drop_guard(),
        }
    }

    /// Opens a socket for `request` as a stream of messages; dropping the
    /// stream closes the socket.
    fn socket<R: Request>(&self, request: R) -> ResponseStream<R::Response> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        self.open_socket(
            ErasedRequest::new(request),
            token.clone(),
            Arc::new(move |result: RequestResult<AnyResponse>| {
                let _ = sender.send(downcast_result(result));
            }),
        );
        ResponseStream::new(receiver, token)
    }
}

impl<S: NetworkService + ?Sized> NetworkServiceExt for S {}

/// Result of [`NetworkServiceExt::send`].
///
/// Resolves to [`RequestError::NoResponse`] if the service drops the call
/// without ever completing it.
#[must_use = "dropping the future cancels the request"]
pub struct ResponseFuture<T> {
    receiver: oneshot::Receiver<RequestResult<T>>,
    _guard: DropGuard,
}

impl<T> Future for ResponseFuture<T> {
    type Output = RequestResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(RequestError::NoResponse)),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub(crate) fn downcast_result<T: 'static>(result: RequestResult<AnyResponse>) -> RequestResult<T> {
    result.and_then(|value| {
        value.downcast::<T>().map(|value| *value).map_err(|_| {
            RequestError::decoding(format!(
                "response is not a {}",
                std::any::type_name::<T>()
            ))
        })
    })
}
