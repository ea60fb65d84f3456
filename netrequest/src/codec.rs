//! Body codecs used by requests from [`Request::encode_body`](crate::Request::encode_body)
//! and [`Request::decode_response`](crate::Request::decode_response).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::BoxError;

/// Turns values into body bytes and back.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, BoxError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError>;
}

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Decoder for requests whose response body carries nothing of interest.
pub fn decode_empty(_body: &Bytes, _status: u16) -> Result<(), BoxError> {
    Ok(())
}

/// Response type for requests that want the body and status untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub body: Bytes,
    pub status: u16,
}

impl RawResponse {
    pub fn decode(body: &Bytes, status: u16) -> Result<Self, BoxError> {
        Ok(Self {
            body: body.clone(),
            status,
        })
    }
}
