//! Nexus client: start operations, follow them through handles, and talk
//! to a remote server over HTTP.
//!
//! [`Client`] works against any [`nexus_core::Handler`]; [`HttpTransport`]
//! is the HTTP implementation, but an in-process `ServiceHandler` works too.

pub mod client;
pub mod error;
pub mod handle;
pub mod http;

pub use client::{Client, ClientOptions, OperationResult, StartOperationResult};
pub use error::ClientError;
pub use handle::OperationHandle;
pub use http::{HttpTransport, HttpTransportConfig, USER_AGENT};
