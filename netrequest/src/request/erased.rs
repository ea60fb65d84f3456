use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::request::Request;
use crate::types::{Headers, HttpCall, HttpMethod, UrlParams};
use crate::{BoxError, RequestResult};

/// A decoded response whose concrete type has been erased.
pub type AnyResponse = Box<dyn Any + Send>;

/// Object-safe view of a [`Request`], used wherever requests of different
/// response types have to travel through the same code (handlers, services,
/// mock tables).
pub trait AnyRequest: Send + Sync + 'static {
    fn path(&self) -> String;
    fn base_url(&self) -> String;
    fn method(&self) -> HttpMethod;
    fn headers(&self) -> Headers;
    fn url_params(&self) -> UrlParams;
    fn request_name(&self) -> String;
    fn description(&self) -> String;
    fn valid_status_code(&self, status: u16) -> bool;
    fn decode_response(&self, body: &Bytes, status: u16) -> Result<AnyResponse, BoxError>;
    fn encode_body(&self) -> Result<Option<Bytes>, BoxError>;
    fn build_call(&self, prefix: &str) -> RequestResult<HttpCall>;

    /// Identity of the concrete request type.
    fn request_type(&self) -> TypeId;

    /// The concrete request, for downcasting.
    fn as_any(&self) -> &dyn Any;
}

struct Erased<R>(R);

impl<R: Request> AnyRequest for Erased<R> {
    fn path(&self) -> String {
        self.0.path()
    }

    fn base_url(&self) -> String {
        self.0.base_url()
    }

    fn method(&self) -> HttpMethod {
        self.0.method()
    }

    fn headers(&self) -> Headers {
        self.0.headers()
    }

    fn url_params(&self) -> UrlParams {
        self.0.url_params()
    }

    fn request_name(&self) -> String {
        self.0.request_name()
    }

    fn description(&self) -> String {
        self.0.description()
    }

    fn valid_status_code(&self, status: u16) -> bool {
        self.0.valid_status_code(status)
    }

    fn decode_response(&self, body: &Bytes, status: u16) -> Result<AnyResponse, BoxError> {
        let value = self.0.decode_response(body, status)?;
        Ok(Box::new(value))
    }

    fn encode_body(&self) -> Result<Option<Bytes>, BoxError> {
        self.0.encode_body()
    }

    fn build_call(&self, prefix: &str) -> RequestResult<HttpCall> {
        self.0.build_call(prefix)
    }

    fn request_type(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

/// A request with its response type erased. Cloning is cheap and shares the
/// underlying request.
#[derive(Clone)]
pub struct ErasedRequest {
    inner: Arc<dyn AnyRequest>,
}

impl ErasedRequest {
    pub fn new<R: Request>(request: R) -> Self {
        Self {
            inner: Arc::new(Erased(request)),
        }
    }

    pub fn from_any(inner: Arc<dyn AnyRequest>) -> Self {
        Self { inner }
    }

    /// The concrete request, if it is an `R`.
    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.inner.as_any().downcast_ref::<R>()
    }

    pub fn is<R: Request>(&self) -> bool {
        self.inner.request_type() == TypeId::of::<R>()
    }
}

impl std::ops::Deref for ErasedRequest {
    type Target = dyn AnyRequest;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl fmt::Debug for ErasedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErasedRequest")
            .field(&self.inner.description())
            .finish()
    }
}
