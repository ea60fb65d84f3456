use std::future::Future;
use std::sync::Arc;
use std::task::Poll;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use tokio_util::sync::CancellationToken;

use crate::builder::HttpNetworkServiceBuilder;
use crate::executor::CompletionExecutor;
use crate::handler::{HandlerChain, RequestHandler, RequestId};
use crate::request::{AnyResponse, ErasedRequest};
use crate::service::{Completion, MessageHandler, NetworkService, RequestHandle};
use crate::transport::{SocketConnector, SocketMessage, Transport};
use crate::types::{has_header, Headers, HttpCall, HttpResponse};
use crate::{BoxError, RequestError, RequestResult};

/// Sends requests through a [`Transport`], running every call through a
/// [`HandlerChain`].
///
/// For each call the service:
/// 1. builds the outgoing call, prefixing its base URL and adding its default
///    headers (headers set by the request win),
/// 2. lets the handlers rewrite or veto it,
/// 3. sends it and maps the raw response to a [`RequestResult`],
/// 4. runs `on_completed` and then the caller's completion, together, on the
///    configured [`CompletionExecutor`].
///
/// Calls run on spawned tokio tasks, so they must be started from within a
/// tokio runtime.
pub struct HttpNetworkService {
    base_url: Option<String>,
    headers: Headers,
    handlers: HandlerChain,
    transport: Arc<dyn Transport>,
    socket_connector: Option<Arc<dyn SocketConnector>>,
    completion: CompletionExecutor,
}

impl HttpNetworkService {
    pub fn builder() -> HttpNetworkServiceBuilder {
        HttpNetworkServiceBuilder::new()
    }

    pub(crate) fn from_parts(
        base_url: Option<String>,
        headers: Headers,
        handlers: HandlerChain,
        transport: Arc<dyn Transport>,
        socket_connector: Option<Arc<dyn SocketConnector>>,
        completion: CompletionExecutor,
    ) -> Self {
        Self {
            base_url,
            headers,
            handlers,
            transport,
            socket_connector,
            completion,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn handlers(&self) -> &HandlerChain {
        &self.handlers
    }

    /// # Panics
    ///
    /// Panics if the base URL and the request's URL do not form a valid URL.
    fn build_call(&self, request: &ErasedRequest) -> RequestResult<HttpCall> {
        let mut call = request.build_call(self.base_url.as_deref().unwrap_or_default())?;
        for (name, value) in &self.headers {
            if !has_header(&call.headers, name) {
                call.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(call)
    }

    fn deliver(
        &self,
        id: RequestId,
        request: ErasedRequest,
        result: RequestResult<AnyResponse>,
        completion: Completion,
    ) {
        deliver(
            &self.completion,
            self.handlers.clone(),
            id,
            request,
            result,
            completion,
        );
    }
}

impl NetworkService for HttpNetworkService {
    /// # Panics
    ///
    /// Panics when the final URL is invalid, or when called outside a tokio
    /// runtime.
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(request = %request.description())))]
    fn dispatch(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        completion: Completion,
    ) -> Option<RequestHandle> {
        #[cfg(feature = "metrics")]
        counter!("netrequest.requests_total", "service" => "http").increment(1);

        let id = RequestId::new();
        self.handlers.on_created(id, &request);

        let call = match self.build_call(&request) {
            Ok(call) => call,
            Err(error) => {
                self.deliver(id, request, Err(error), completion);
                return None;
            }
        };

        let handlers = self.handlers.clone();
        let transport = Arc::clone(&self.transport);
        let executor = self.completion.clone();
        let task_token = token.clone();

        tokio::spawn(async move {
            let outcome = until_cancelled(
                &task_token,
                perform(id, &request, call, &handlers, transport.as_ref()),
            )
            .await;
            match outcome {
                Some(result) => deliver(&executor, handlers, id, request, result, completion),
                None => {
                    #[cfg(feature = "tracing")]
                    debug!(%id, "request cancelled");
                }
            }
        });

        Some(RequestHandle::new(token))
    }

    /// Binary messages are decoded one by one as if they were a response with
    /// status 200; text messages are skipped. Without a socket connector the
    /// socket answers [`RequestError::NoResponse`].
    ///
    /// # Panics
    ///
    /// Panics when the final URL is invalid, or when called outside a tokio
    /// runtime.
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(request = %request.description())))]
    fn open_socket(
        &self,
        request: ErasedRequest,
        token: CancellationToken,
        on_message: MessageHandler,
    ) -> Option<RequestHandle> {
        #[cfg(feature = "metrics")]
        counter!("netrequest.requests_total", "service" => "http_socket").increment(1);

        let id = RequestId::new();
        self.handlers.on_created(id, &request);

        let socket = Socket {
            id,
            request,
            handlers: self.handlers.clone(),
            executor: self.completion.clone(),
            on_message,
        };

        let Some(connector) = self.socket_connector.clone() else {
            socket.deliver(Err(RequestError::NoResponse));
            return None;
        };

        let call = match self.build_call(&socket.request) {
            Ok(call) => call,
            Err(error) => {
                socket.deliver(Err(error));
                return None;
            }
        };

        let task_token = token.clone();
        tokio::spawn(async move {
            socket.run(call, connector.as_ref(), &task_token).await;
        });

        Some(RequestHandle::new(token))
    }
}

async fn until_cancelled<F: Future>(token: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = future => Some(output),
    }
}

async fn perform(
    id: RequestId,
    request: &ErasedRequest,
    call: HttpCall,
    handlers: &HandlerChain,
    transport: &dyn Transport,
) -> RequestResult<AnyResponse> {
    let call = handlers
        .on_modify(id, request, call)
        .await
        .map_err(|error| {
            #[cfg(feature = "tracing")]
            debug!(%id, %error, "request vetoed by handler");
            RequestError::handler(error)
        })?;

    // Poll once so the call has reached the transport before `on_sent` runs.
    let mut sending = transport.send_http_request(call);
    let first = futures::poll!(&mut sending);
    handlers.on_sent(id, request);
    let response = match first {
        Poll::Ready(response) => response,
        Poll::Pending => sending.await,
    };
    resolve(request, response)
}

fn resolve(
    request: &ErasedRequest,
    response: Result<HttpResponse, BoxError>,
) -> RequestResult<AnyResponse> {
    let response = response.map_err(RequestError::network)?;
    let Some(body) = response.body else {
        return Err(RequestError::NoResponse);
    };
    let status = response.status.unwrap_or(0);
    if !request.valid_status_code(status) {
        return Err(RequestError::Api { status, body });
    }
    request
        .decode_response(&body, status)
        .map_err(RequestError::decoding)
}

fn deliver(
    executor: &CompletionExecutor,
    handlers: HandlerChain,
    id: RequestId,
    request: ErasedRequest,
    result: RequestResult<AnyResponse>,
    completion: Completion,
) {
    #[cfg(feature = "metrics")]
    if let Err(error) = &result {
        counter!("netrequest.request_failures_total", "kind" => error.kind_label()).increment(1);
    }
    executor.execute(move || {
        handlers.on_completed(id, &request, &result);
        completion(result);
    });
}

/// State of one open socket.
struct Socket {
    id: RequestId,
    request: ErasedRequest,
    handlers: HandlerChain,
    executor: CompletionExecutor,
    on_message: MessageHandler,
}

impl Socket {
    async fn run(
        self,
        call: HttpCall,
        connector: &dyn SocketConnector,
        token: &CancellationToken,
    ) {
        let id = self.id;
        let modifying = self.handlers.on_modify(id, &self.request, call);
        let call = match until_cancelled(token, modifying).await {
            None => return,
            Some(Ok(call)) => call,
            Some(Err(error)) => {
                self.deliver(Err(RequestError::handler(error)));
                return;
            }
        };

        let mut connecting = connector.connect(call);
        let first = futures::poll!(&mut connecting);
        self.handlers.on_sent(id, &self.request);
        let connected = match first {
            Poll::Ready(connected) => Some(connected),
            Poll::Pending => until_cancelled(token, connecting).await,
        };
        let mut connection = match connected {
            None => return,
            Some(Ok(connection)) => connection,
            Some(Err(error)) => {
                self.deliver(Err(RequestError::network(error)));
                return;
            }
        };

        loop {
            let message = match until_cancelled(token, connection.receive()).await {
                Some(message) => message,
                None => {
                    #[cfg(feature = "tracing")]
                    debug!(%id, "socket cancelled");
                    connection.close().await;
                    return;
                }
            };
            match message {
                Ok(SocketMessage::Binary(bytes)) => {
                    let result = self
                        .request
                        .decode_response(&bytes, 200)
                        .map_err(RequestError::decoding);
                    self.deliver(result);
                }
                Ok(SocketMessage::Text(_)) => {}
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    debug!(%id, %error, "socket failed");
                    self.deliver(Err(RequestError::network(error)));
                    connection.close().await;
                    return;
                }
            }
        }
    }

    fn deliver(&self, result: RequestResult<AnyResponse>) {
        #[cfg(feature = "metrics")]
        counter!("netrequest.socket_messages_total").increment(1);

        let handlers = self.handlers.clone();
        let request = self.request.clone();
        let on_message = Arc::clone(&self.on_message);
        let id = self.id;
        self.executor.execute(move || {
            handlers.on_completed(id, &request, &result);
            on_message(result);
        });
    }
}
