//! Dispatch configuration.

use crate::retry::RetryPolicy;
use serde::Deserialize;

/// Records per chunk; matches the remote service's batch sweet spot.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// In-flight ceiling for search operations (service limit: 50 req/s).
pub const DEFAULT_SEARCH_IN_FLIGHT: usize = 50;

/// In-flight ceiling for route calculation (service limit: 10 req/s).
pub const DEFAULT_ROUTE_IN_FLIGHT: usize = 10;

/// Configuration for batch dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum records per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Ceiling on concurrently in-flight search calls across all chunks.
    #[serde(default = "default_search_in_flight")]
    pub max_in_flight: usize,
    /// Ceiling on concurrently in-flight route calculations.
    #[serde(default = "default_route_in_flight")]
    pub route_max_in_flight: usize,
    /// Retry policy shared by every per-item call.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_search_in_flight() -> usize {
    DEFAULT_SEARCH_IN_FLIGHT
}

fn default_route_in_flight() -> usize {
    DEFAULT_ROUTE_IN_FLIGHT
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: DEFAULT_SEARCH_IN_FLIGHT,
            route_max_in_flight: DEFAULT_ROUTE_IN_FLIGHT,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_limits() {
        let config = DispatchConfig::default();
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.max_in_flight, 50);
        assert_eq!(config.route_max_in_flight, 10);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: DispatchConfig = serde_json::from_str(r#"{"chunk_size": 10}"#).unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.max_in_flight, 50);
        assert_eq!(config.retry.max_attempts, 5);
    }
}
