//! Failsafe mechanisms for outbound boundary calls

mod retry;

pub use retry::{RetryPolicy, with_retry};
