pub mod fetch;
pub mod retry;

pub use fetch::{FetchError, Fetcher};
pub use retry::{with_retry, RetryConfig, RetryDecision, RetryError};
