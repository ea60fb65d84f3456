//! Streams of results delivered by sockets.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::service::RequestHandle;
use crate::RequestResult;

/// Messages of a socket opened with
/// [`NetworkServiceExt::socket`](crate::service::NetworkServiceExt::socket).
///
/// Each item is one decoded message. The stream ends once the socket
/// terminates; dropping it closes the socket.
pub struct ResponseStream<T> {
    receiver: UnboundedReceiver<RequestResult<T>>,
    handle: RequestHandle,
    _guard: DropGuard,
}

impl<T> ResponseStream<T> {
    pub(crate) fn new(
        receiver: UnboundedReceiver<RequestResult<T>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            handle: RequestHandle::new(token.clone()),
            _guard: token.drop_guard(),
        }
    }

    /// Handle that closes the socket without dropping the stream. Messages
    /// already delivered stay readable.
    pub fn handle(&self) -> RequestHandle {
        self.handle.clone()
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = RequestResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
