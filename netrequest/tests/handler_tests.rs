mod common;

use std::sync::{Arc, Mutex};

use netrequest::handler::RequestHandler;
use netrequest::service::HttpNetworkService;
use netrequest::transport::MockTransport;
use netrequest::types::HttpResponse;
use netrequest::{NetworkServiceExt, RequestError};

use common::{Item, ItemRequest, RecordingHandler};

fn service(
    transport: &MockTransport,
    handlers: Vec<Arc<dyn RequestHandler>>,
) -> HttpNetworkService {
    HttpNetworkService::builder()
        .base_url("https://api.example.com")
        .transport(Arc::new(transport.clone()))
        .handlers(handlers)
        .build()
        .unwrap()
}

fn ok_transport() -> MockTransport {
    MockTransport::new().with_response(HttpResponse::new(200, Item::new(1, "ok").json()))
}

#[tokio::test]
async fn test_handlers_modify_the_call_in_order() {
    let transport = ok_transport();
    let one = Arc::new(RecordingHandler::adding("one", "1"));
    let two = Arc::new(RecordingHandler::adding("two", "2"));
    let service = service(&transport, vec![one.clone() as Arc<dyn RequestHandler>, two.clone()]);

    service.send(ItemRequest::default()).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].headers.get("one").map(String::as_str), Some("1"));
    assert_eq!(calls[0].headers.get("two").map(String::as_str), Some("2"));
    assert_eq!(one.counts(), (1, 1, 1, 1));
    assert_eq!(two.counts(), (1, 1, 1, 1));
}

#[tokio::test]
async fn test_later_handler_overrides_earlier_header() {
    let transport = ok_transport();
    let service = service(
        &transport,
        vec![
            Arc::new(RecordingHandler::adding("x-trace", "first")) as Arc<dyn RequestHandler>,
            Arc::new(RecordingHandler::adding("x-trace", "second")),
        ],
    );

    service.send(ItemRequest::default()).await.unwrap();

    assert_eq!(
        transport.calls()[0].headers.get("x-trace").map(String::as_str),
        Some("second")
    );
}

#[tokio::test]
async fn test_failing_handler_stops_the_chain() {
    let transport = ok_transport();
    let failing = Arc::new(RecordingHandler::failing("not allowed"));
    let after = Arc::new(RecordingHandler::adding("two", "2"));
    let handlers = vec![failing.clone() as Arc<dyn RequestHandler>, after.clone()];
    let service = service(&transport, handlers);

    let error = service.send(ItemRequest::default()).await.unwrap_err();

    assert!(matches!(error, RequestError::Handler(_)));
    assert_eq!(error.to_string(), "not allowed");
    assert!(transport.calls().is_empty());

    // created and completed still fire; nothing was sent
    assert_eq!(failing.counts(), (1, 1, 0, 1));
    assert_eq!(after.counts(), (1, 0, 0, 1));
}

#[tokio::test]
async fn test_hooks_fire_in_lifecycle_order() {
    let transport = ok_transport();
    let events = Arc::new(Mutex::new(Vec::new()));
    let service = service(
        &transport,
        vec![Arc::new(RecordingHandler::logging(Arc::clone(&events))) as Arc<dyn RequestHandler>],
    );

    service.send(ItemRequest::default()).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["created", "modify", "sent", "completed"]
    );
}

#[tokio::test]
async fn test_completed_sees_failures_too() {
    let transport = MockTransport::new().with_error("connection reset");
    let handler = Arc::new(RecordingHandler::default());
    let service = service(&transport, vec![handler.clone() as Arc<dyn RequestHandler>]);

    let error = service.send(ItemRequest::default()).await.unwrap_err();

    assert!(matches!(error, RequestError::Network(_)));
    assert_eq!(handler.counts(), (1, 1, 1, 1));
}

#[tokio::test]
async fn test_empty_chain_passes_the_call_through() {
    let transport = ok_transport();
    let service = service(&transport, Vec::new());

    service.send(ItemRequest::with_id(4)).await.unwrap();

    let call = &transport.calls()[0];
    assert!(call.headers.is_empty());
    assert_eq!(call.url.as_str(), "https://api.example.com/item?id=4");
}
