//! Top-level dispatch facade for geocoding, reverse geocoding, and routing.

use crate::batch::BatchDispatcher;
use crate::config::DispatchConfig;
use crate::error::BatchError;
use crate::retry::{call_with_retry, OperationKind};
use crate::route::{build_route_request, call_route, RoutePlan};
use geobatch_abstraction::{
    CallContext, GeocodeRecord, GeocodedAddress, LocationBackend, PositionQuery, PositionRecord,
    Resolved, ResolvedPosition, RouteSummary, SearchResults, TextQuery,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Batch entry point over a [`LocationBackend`].
///
/// Owns the chunking/fan-out machinery for the two search operations and a
/// separate, smaller concurrency ceiling for route calculation. Per-item
/// faults never escape: records that fail or come back empty are simply
/// absent from the output.
pub struct LocationDispatcher<B: ?Sized> {
    backend: Arc<B>,
    config: DispatchConfig,
    search: BatchDispatcher,
    route_limiter: Arc<Semaphore>,
}

impl<B> LocationDispatcher<B>
where
    B: LocationBackend + ?Sized,
{
    /// Create a dispatcher with the default configuration.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, DispatchConfig::default())
    }

    /// Create a dispatcher with an explicit configuration.
    #[must_use]
    pub fn with_config(backend: Arc<B>, config: DispatchConfig) -> Self {
        let search = BatchDispatcher::from_config(&config);
        let route_limiter = Arc::new(Semaphore::new(config.route_max_in_flight));
        Self { backend, config, search, route_limiter }
    }

    /// Geocode a collection of addresses against `place_index`.
    ///
    /// Records are chunked and processed concurrently; each resolved item is
    /// the best text match merged with the record's correlation id. Earlier
    /// chunks' results precede later chunks'; records that were not found,
    /// permanently failed, or exhausted retries are omitted.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidChunkSize`] when the configured chunk
    /// size is zero.
    pub async fn geocode_addresses(
        &self,
        place_index: &str,
        records: Vec<GeocodeRecord>,
        ctx: &CallContext,
    ) -> Result<Vec<GeocodedAddress>, BatchError> {
        info!(
            operation = OperationKind::SearchByText.as_str(),
            place_index = place_index,
            records = records.len(),
            region = ctx.region(),
            "Dispatching geocoding batch"
        );

        let resolved = self
            .search
            .dispatch(records, |record: GeocodeRecord| async move {
                let query = TextQuery::new(place_index, record.address);
                let outcome =
                    call_with_retry(OperationKind::SearchByText, &self.config.retry, || async {
                        self.backend
                            .search_by_text(&query, ctx)
                            .await
                            .map(SearchResults::into_first)
                    })
                    .await;

                outcome.map(|result| Resolved { waypoint_id: record.waypoint_id, result })
            })
            .await?;

        info!(
            operation = OperationKind::SearchByText.as_str(),
            resolved = resolved.len(),
            "Geocoding batch settled"
        );

        Ok(resolved)
    }

    /// Reverse-geocode a collection of coordinate pairs against `place_index`.
    ///
    /// Same dispatch, ordering, and omission contract as
    /// [`Self::geocode_addresses`].
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidChunkSize`] when the configured chunk
    /// size is zero.
    pub async fn reverse_geocode(
        &self,
        place_index: &str,
        records: Vec<PositionRecord>,
        ctx: &CallContext,
    ) -> Result<Vec<ResolvedPosition>, BatchError> {
        info!(
            operation = OperationKind::SearchByPosition.as_str(),
            place_index = place_index,
            records = records.len(),
            region = ctx.region(),
            "Dispatching reverse-geocoding batch"
        );

        let resolved = self
            .search
            .dispatch(records, |record: PositionRecord| async move {
                let query = PositionQuery::new(place_index, record.position());
                let outcome = call_with_retry(
                    OperationKind::SearchByPosition,
                    &self.config.retry,
                    || async {
                        self.backend
                            .search_by_position(&query, ctx)
                            .await
                            .map(SearchResults::into_first)
                    },
                )
                .await;

                outcome.map(|result| Resolved { waypoint_id: record.waypoint_id, result })
            })
            .await?;

        info!(
            operation = OperationKind::SearchByPosition.as_str(),
            resolved = resolved.len(),
            "Reverse-geocoding batch settled"
        );

        Ok(resolved)
    }

    /// Calculate a single route.
    ///
    /// Applies the fixed request defaults, shares the search operations'
    /// retry/backoff contract, and collapses every failure to `None` after
    /// logging it.
    pub async fn calculate_route(
        &self,
        calculator: &str,
        plan: &RoutePlan,
        ctx: &CallContext,
    ) -> Option<RouteSummary> {
        let request = build_route_request(calculator, plan);

        let _permit = match self.route_limiter.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                error!(
                    operation = OperationKind::CalculateRoute.as_str(),
                    error = %err,
                    "Route concurrency limiter closed"
                );
                return None;
            }
        };

        info!(
            operation = OperationKind::CalculateRoute.as_str(),
            calculator = calculator,
            region = ctx.region(),
            "Calculating route"
        );

        call_route(self.backend.as_ref(), &self.config.retry, &request, ctx)
            .await
            .into_option()
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}
