//! Provider authentication types and traits

pub mod errors;
pub mod traits;

pub use errors::AuthError;
pub use traits::{AuthToken, Authenticator};

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
