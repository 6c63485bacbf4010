//! Route request construction and the single-shot route caller.

use crate::retry::{call_with_retry, ItemOutcome, OperationKind, RetryPolicy};
use geobatch_abstraction::{
    CallContext, DistanceUnit, LocationBackend, RouteRequest, RouteSummary, TravelMode,
    TruckModeOptions,
};
use serde::{Deserialize, Serialize};

/// An intermediate stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWaypoint {
    /// Caller-supplied identifier for the stop.
    pub id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub long: f64,
}

/// Caller-facing route description, before fixed defaults are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// `[longitude, latitude]` of the departure point.
    pub departure_position: [f64; 2],
    /// `[longitude, latitude]` of the destination.
    pub destination_position: [f64; 2],
    /// Intermediate stops in visit order.
    #[serde(default)]
    pub waypoints: Option<Vec<RouteWaypoint>>,
    /// Distance unit override; Kilometers when unset.
    #[serde(default)]
    pub distance_unit: Option<DistanceUnit>,
    /// Travel mode override; Truck when unset.
    #[serde(default)]
    pub travel_mode: Option<TravelMode>,
}

/// Convert waypoints to the `[longitude, latitude]` pairs the service expects.
fn convert_waypoints(waypoints: &[RouteWaypoint]) -> Vec<[f64; 2]> {
    waypoints.iter().map(|w| [w.long, w.lat]).collect()
}

/// Build the full route-calculation payload from a plan.
///
/// Applies the fixed defaults: depart now, kilometers, truck mode with
/// avoid-ferries (but not avoid-tolls), and no leg geometry. Truck options
/// are attached only when the effective travel mode is truck.
#[must_use]
pub fn build_route_request(calculator: &str, plan: &RoutePlan) -> RouteRequest {
    let travel_mode = plan.travel_mode.unwrap_or_default();

    RouteRequest {
        calculator_name: calculator.to_string(),
        depart_now: true,
        distance_unit: plan.distance_unit.unwrap_or_default(),
        include_leg_geometry: false,
        travel_mode,
        truck_mode_options: (travel_mode == TravelMode::Truck)
            .then_some(TruckModeOptions { avoid_ferries: true, avoid_tolls: false }),
        departure_position: plan.departure_position,
        destination_position: plan.destination_position,
        waypoint_positions: plan.waypoints.as_deref().map(convert_waypoints),
    }
}

/// Issue one route calculation, absorbing throttling via the shared retry
/// contract. A response without a summary resolves as not-found.
pub async fn call_route<B>(
    backend: &B,
    policy: &RetryPolicy,
    request: &RouteRequest,
    ctx: &CallContext,
) -> ItemOutcome<RouteSummary>
where
    B: LocationBackend + ?Sized,
{
    call_with_retry(OperationKind::CalculateRoute, policy, || async {
        backend.calculate_route(request, ctx).await.map(|response| response.summary)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use async_trait::async_trait;
    use geobatch_abstraction::{
        LocationError, PositionQuery, PositionResult, RouteResponse, SearchResults, TextQuery,
        TextResult,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn plan() -> RoutePlan {
        RoutePlan {
            departure_position: [-0.1276, 51.5034],
            destination_position: [-1.2577, 51.7520],
            waypoints: None,
            distance_unit: None,
            travel_mode: None,
        }
    }

    #[test]
    fn truck_defaults_are_applied() {
        let request = build_route_request("calc1", &plan());

        assert!(request.depart_now);
        assert!(!request.include_leg_geometry);
        assert_eq!(request.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(request.travel_mode, TravelMode::Truck);
        assert_eq!(
            request.truck_mode_options,
            Some(TruckModeOptions { avoid_ferries: true, avoid_tolls: false })
        );
    }

    #[test]
    fn non_truck_mode_has_no_truck_options() {
        let mut car_plan = plan();
        car_plan.travel_mode = Some(TravelMode::Car);

        let request = build_route_request("calc1", &car_plan);
        assert_eq!(request.travel_mode, TravelMode::Car);
        assert!(request.truck_mode_options.is_none());
    }

    #[test]
    fn waypoints_convert_to_long_lat_pairs() {
        let mut with_stops = plan();
        with_stops.waypoints = Some(vec![
            RouteWaypoint { id: "wp1".to_string(), lat: 51.0, long: -0.5 },
            RouteWaypoint { id: "wp2".to_string(), lat: 52.0, long: -0.7 },
        ]);

        let request = build_route_request("calc1", &with_stops);
        assert_eq!(request.waypoint_positions, Some(vec![[-0.5, 51.0], [-0.7, 52.0]]));
    }

    struct ThrottlingRouteBackend {
        calls: AtomicU32,
        succeed_after: u32,
    }

    #[async_trait]
    impl LocationBackend for ThrottlingRouteBackend {
        async fn search_by_position(
            &self,
            _query: &PositionQuery,
            _ctx: &CallContext,
        ) -> Result<SearchResults<PositionResult>, LocationError> {
            unimplemented!("route-only backend")
        }

        async fn search_by_text(
            &self,
            _query: &TextQuery,
            _ctx: &CallContext,
        ) -> Result<SearchResults<TextResult>, LocationError> {
            unimplemented!("route-only backend")
        }

        async fn calculate_route(
            &self,
            _request: &RouteRequest,
            _ctx: &CallContext,
        ) -> Result<RouteResponse, LocationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.succeed_after {
                return Err(LocationError::Throttled { message: None });
            }
            Ok(RouteResponse {
                summary: Some(RouteSummary {
                    distance: 92.3,
                    duration_seconds: 5520.0,
                    ..RouteSummary::default()
                }),
            })
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            backoff: BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4)),
        }
    }

    #[tokio::test]
    async fn route_caller_shares_the_retry_contract() {
        let backend = ThrottlingRouteBackend { calls: AtomicU32::new(0), succeed_after: 2 };
        let request = build_route_request("calc1", &plan());

        let outcome =
            call_route(&backend, &fast_policy(), &request, &CallContext::new()).await;

        match outcome {
            ItemOutcome::Resolved(summary) => assert_eq!(summary.distance, 92.3),
            other => panic!("expected resolved summary, got {other:?}"),
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn route_caller_gives_up_after_five_attempts() {
        let backend = ThrottlingRouteBackend { calls: AtomicU32::new(0), succeed_after: u32::MAX };
        let request = build_route_request("calc1", &plan());

        let outcome =
            call_route(&backend, &fast_policy(), &request, &CallContext::new()).await;

        assert_eq!(outcome, ItemOutcome::Exhausted);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn missing_summary_resolves_absent() {
        struct NoSummaryBackend;

        #[async_trait]
        impl LocationBackend for NoSummaryBackend {
            async fn search_by_position(
                &self,
                _query: &PositionQuery,
                _ctx: &CallContext,
            ) -> Result<SearchResults<PositionResult>, LocationError> {
                unimplemented!()
            }

            async fn search_by_text(
                &self,
                _query: &TextQuery,
                _ctx: &CallContext,
            ) -> Result<SearchResults<TextResult>, LocationError> {
                unimplemented!()
            }

            async fn calculate_route(
                &self,
                _request: &RouteRequest,
                _ctx: &CallContext,
            ) -> Result<RouteResponse, LocationError> {
                Ok(RouteResponse { summary: None })
            }
        }

        let request = build_route_request("calc1", &plan());
        let outcome =
            call_route(&NoSummaryBackend, &fast_policy(), &request, &CallContext::new()).await;

        assert_eq!(outcome, ItemOutcome::NotFound);
    }
}
