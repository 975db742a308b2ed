//! Authenticated HTTP client with single-flight credential refresh.

mod client;
mod envelope;
mod error;
mod pending;
mod request;
mod transport;

pub use client::{AuthClient, AuthClientBuilder};
pub use envelope::{Envelope, Outcome, classify};
pub use error::{ApiError, TransportError};
pub use pending::{PendingQueue, RefreshOutcome};
pub use request::{ApiRequest, RawResponse};
pub use transport::{ReqwestTransport, Transport};

#[cfg(test)]
pub use transport::MockTransport;
