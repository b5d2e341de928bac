pub mod backoff;
pub mod subscribe;

pub use backoff::BackoffConfig;
pub use subscribe::{PartialObserver, Unsubscribe};
