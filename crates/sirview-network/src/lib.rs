//! HTTP transport for the SIR simulation service.
//!
//! Two ways to get data out of the service:
//! - [`TransportClient::run_batch`]: one request/response round trip that
//!   yields a complete, validated [`RunResult`](sirview_protocol::RunResult).
//! - [`TransportClient::open_stream`]: a server-sent-event subscription that
//!   reports one [`StreamEvent`] per pushed payload until it is closed.

pub mod client;
pub mod error;
pub mod sse;
pub mod stream;
pub mod transport;

pub use client::TransportClient;
pub use error::ClientError;
pub use stream::{StreamEvent, Subscription};
pub use transport::TransportConfig;
