mod http;
mod retry;
mod traits;

pub use http::{HEALTH_ACTION, HttpDispatchGateway, build_worker_client};
pub use retry::{DispatchOutcome, RetryPolicy, dispatch_bounded, dispatch_with_retry};
pub use traits::{DispatchFuture, DispatchGateway, DispatchRequest};
