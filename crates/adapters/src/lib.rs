//! Realty Adapters
//!
//! Provider-facing plumbing: endpoint resolution, login and token refresh,
//! pooled HTTP clients and the authenticated transport.

pub mod auth;
pub mod client_cache;
pub mod resolver;
pub mod transport;

pub use auth::{LeasedToken, LoginAuthenticator, LoginCredentials, TokenManager};
pub use client_cache::{global_client_cache, ClientCache, ClientConfig};
pub use resolver::{DetailPlan, EndpointResolver, Filters, PhasedRequest, SecondaryRequest};
pub use transport::{HttpTransport, RetryPolicy};
pub use realty_types::{Transport, TransportError, TransportResult};
