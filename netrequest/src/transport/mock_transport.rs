use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

use async_trait::async_trait;

use crate::transport::{SocketConnection, SocketConnector, SocketMessage, Transport};
use crate::types::{HttpCall, HttpResponse};
use crate::BoxError;

/// A scripted [`Transport`] and [`SocketConnector`] for tests.
///
/// Responses are handed out in the order they were queued. When the queue is
/// empty, an [`HttpResponse::empty`] is returned. Every call that reaches the
/// transport is recorded, so tests can check what request handlers did to it.
#[derive(Clone, Default)]
pub struct MockTransport {
    /// Queued answers for non-streaming calls; `Err` is a transport failure.
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
    /// Every call seen by `send_http_request` or `connect`.
    calls: Arc<Mutex<Vec<HttpCall>>>,
    /// One script per future socket connection.
    sockets: Arc<Mutex<VecDeque<SocketScript>>>,
    /// Number of sockets closed by their owner.
    closed_sockets: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

struct SocketScript {
    messages: VecDeque<SocketMessage>,
    stay_open: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a new, empty [`MockTransport`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next non-streaming call.
    pub fn with_response(self, response: HttpResponse) -> Self {
        lock(&self.responses).push_back(Ok(response));
        self
    }

    /// Queues a transport failure for the next non-streaming call.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.responses).push_back(Err(message.into()));
        self
    }

    /// Makes every non-streaming call wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a socket that delivers `messages` and then fails as closed.
    pub fn with_socket(self, messages: Vec<SocketMessage>) -> Self {
        lock(&self.sockets).push_back(SocketScript {
            messages: messages.into(),
            stay_open: false,
        });
        self
    }

    /// Queues a socket that delivers `messages` and then stays open.
    pub fn with_open_socket(self, messages: Vec<SocketMessage>) -> Self {
        lock(&self.sockets).push_back(SocketScript {
            messages: messages.into(),
            stay_open: true,
        });
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<HttpCall> {
        lock(&self.calls).clone()
    }

    pub fn closed_sockets(&self) -> usize {
        self.closed_sockets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    #[cfg_attr(feature = "tracing", instrument(skip(self, call)))]
    async fn send_http_request(&self, call: HttpCall) -> Result<HttpResponse, BoxError> {
        lock(&self.calls).push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = lock(&self.responses).pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Ok(HttpResponse::empty()),
        }
    }
}

#[async_trait]
impl SocketConnector for MockTransport {
    async fn connect(&self, call: HttpCall) -> Result<Box<dyn SocketConnection>, BoxError> {
        lock(&self.calls).push(call);
        let script = lock(&self.sockets).pop_front();
        match script {
            Some(script) => Ok(Box::new(MockSocket {
                script,
                closed_sockets: Arc::clone(&self.closed_sockets),
            })),
            None => Err("no socket scripted".into()),
        }
    }
}

struct MockSocket {
    script: SocketScript,
    closed_sockets: Arc<AtomicUsize>,
}

#[async_trait]
impl SocketConnection for MockSocket {
    async fn receive(&mut self) -> Result<SocketMessage, BoxError> {
        match self.script.messages.pop_front() {
            Some(message) => Ok(message),
            None if self.script.stay_open => std::future::pending().await,
            None => Err("socket closed".into()),
        }
    }

    async fn close(&mut self) {
        self.closed_sockets.fetch_add(1, Ordering::SeqCst);
    }
}
