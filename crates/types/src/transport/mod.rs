//! Transport seam between request resolution and the network

pub mod errors;
pub mod traits;

pub use errors::TransportError;
pub use traits::Transport;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
