//! Global limits and defaults for configuration and runtime

/// Default timeout of one outbound provider request in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000; // 5s

/// Minimum allowed request timeout in milliseconds
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 100;

/// Maximum allowed request timeout in milliseconds
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Default overall deadline of one detail aggregation in milliseconds
pub const DEFAULT_AGGREGATION_DEADLINE_MS: u64 = 8_000; // 8s

/// Default ceiling of concurrently in-flight secondary requests per detail call
pub const DEFAULT_FAN_OUT_CONCURRENCY: usize = 6;

/// Maximum allowed fan-out ceiling
pub const MAX_FAN_OUT_CONCURRENCY: usize = 32;

/// Default number of attempts for idempotent requests (first try included)
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Maximum allowed attempts for idempotent requests
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Default base delay of the exponential backoff in milliseconds
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Default cap of a single backoff delay in milliseconds
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 2_000;

/// Tokens this close to expiry are refreshed before use
pub const TOKEN_REFRESH_SKEW_SECONDS: i64 = 60;

/// Lifetime assumed when the login response carries no expiry
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3_600;

/// Default TTL of cached dictionaries in seconds
pub const DEFAULT_DICTIONARY_TTL_SECONDS: u64 = 300;

/// Default TTL of cached media collections in seconds
pub const DEFAULT_MEDIA_TTL_SECONDS: u64 = 120;
