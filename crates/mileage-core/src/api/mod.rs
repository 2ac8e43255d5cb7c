//! Backend access.
//!
//! The backend's routing convention is not known up front, so every logical
//! operation goes through a [`Dispatcher`] that tries a list of URL styles
//! (and, for writes, body encodings) until one succeeds. [`ApiClient`] turns
//! the raw JSON into model types.

pub mod candidates;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use candidates::{BodyEncoding, RouteStyle};
pub use client::ApiClient;
pub use dispatcher::{Dispatcher, Payload};
pub use error::{AttemptError, SyncError};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody, Transport};
