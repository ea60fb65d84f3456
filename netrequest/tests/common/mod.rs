#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use netrequest::codec::{Codec, JsonCodec};
use netrequest::handler::{RequestHandler, RequestId};
use netrequest::request::{AnyResponse, ErasedRequest};
use netrequest::types::{HttpCall, HttpMethod, UrlParams};
use netrequest::{BoxError, Request, RequestResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
}

impl Item {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }

    pub fn json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemRequest {
    pub id: Option<u32>,
}

impl ItemRequest {
    pub fn with_id(id: u32) -> Self {
        Self { id: Some(id) }
    }
}

impl Request for ItemRequest {
    type Response = Item;

    fn path(&self) -> String {
        "/item".into()
    }

    fn url_params(&self) -> UrlParams {
        UrlParams::new().with_opt("id", self.id)
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Item, BoxError> {
        JsonCodec.decode(body)
    }
}

/// Same path, method and params as [`ItemRequest`], different type.
#[derive(Debug, Clone, Default)]
pub struct ItemLookup {
    pub id: Option<u32>,
}

impl Request for ItemLookup {
    type Response = Item;

    fn path(&self) -> String {
        "/item".into()
    }

    fn url_params(&self) -> UrlParams {
        UrlParams::new().with_opt("id", self.id)
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Item, BoxError> {
        JsonCodec.decode(body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemRequest2;

impl Request for ItemRequest2 {
    type Response = Item;

    fn path(&self) -> String {
        "/item2".into()
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Item, BoxError> {
        JsonCodec.decode(body)
    }
}

/// POSTs an item and carries its own headers.
#[derive(Debug, Clone)]
pub struct CreateItem {
    pub item: Item,
}

impl Request for CreateItem {
    type Response = Item;

    fn path(&self) -> String {
        "/items".into()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::POST
    }

    fn headers(&self) -> netrequest::types::Headers {
        [("Content-Type".to_string(), "application/json".to_string())].into()
    }

    fn encode_body(&self) -> Result<Option<Bytes>, BoxError> {
        JsonCodec.encode(&self.item).map(Some)
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Item, BoxError> {
        JsonCodec.decode(body)
    }
}

/// Fails to encode its body.
#[derive(Debug, Clone)]
pub struct BrokenBody;

impl Request for BrokenBody {
    type Response = Item;

    fn path(&self) -> String {
        "/broken".into()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::PUT
    }

    fn encode_body(&self) -> Result<Option<Bytes>, BoxError> {
        Err("cannot encode".into())
    }

    fn decode_response(&self, body: &Bytes, _status: u16) -> Result<Item, BoxError> {
        JsonCodec.decode(body)
    }
}

/// Adds one header in `on_modify` and counts every hook.
#[derive(Default)]
pub struct RecordingHandler {
    pub header: Option<(String, String)>,
    pub fail_with: Option<String>,
    pub created: AtomicUsize,
    pub modified: AtomicUsize,
    pub sent: AtomicUsize,
    pub completed: AtomicUsize,
    pub events: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingHandler {
    pub fn adding(name: &str, value: &str) -> Self {
        Self {
            header: Some((name.to_string(), value.to_string())),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn logging(events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            events: Some(events),
            ..Default::default()
        }
    }

    fn log(&self, event: &str) {
        if let Some(events) = &self.events {
            events.lock().unwrap().push(event.to_string());
        }
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.created.load(Ordering::SeqCst),
            self.modified.load(Ordering::SeqCst),
            self.sent.load(Ordering::SeqCst),
            self.completed.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    fn on_created(&self, _id: RequestId, _request: &ErasedRequest) {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.log("created");
    }

    async fn on_modify(
        &self,
        _id: RequestId,
        _request: &ErasedRequest,
        call: HttpCall,
    ) -> Result<HttpCall, BoxError> {
        self.modified.fetch_add(1, Ordering::SeqCst);
        self.log("modify");
        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }
        Ok(match &self.header {
            Some((name, value)) => call.header(name.clone(), value.clone()),
            None => call,
        })
    }

    fn on_sent(&self, _id: RequestId, _request: &ErasedRequest) {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.log("sent");
    }

    fn on_completed(
        &self,
        _id: RequestId,
        _request: &ErasedRequest,
        _result: &RequestResult<AnyResponse>,
    ) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.log("completed");
    }
}
