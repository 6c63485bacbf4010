//! Batch-dispatch-and-retry engine for a rate-limited location service.
//!
//! The crate translates bulk geocoding, reverse-geocoding, and
//! route-calculation input into concurrent per-record calls against a
//! [`geobatch_abstraction::LocationBackend`], absorbing throttling via
//! full-jitter exponential backoff and reassembling partial results in
//! stable chunk order.

pub mod backoff;
pub mod batch;
pub mod chunk;
pub mod config;
pub mod error;
pub mod retry;
pub mod route;
pub mod service;

pub use backoff::BackoffPolicy;
pub use batch::BatchDispatcher;
pub use chunk::chunk;
pub use config::DispatchConfig;
pub use error::BatchError;
pub use retry::{call_with_retry, ItemOutcome, OperationKind, RetryPolicy};
pub use route::{build_route_request, call_route, RoutePlan, RouteWaypoint};
pub use service::LocationDispatcher;
