//! Values that cross the boundary between requests, handlers and transports.

mod http;

pub use http::*;
