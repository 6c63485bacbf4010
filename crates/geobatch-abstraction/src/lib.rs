//! Location backend abstraction layer for geobatch.
//!
//! This module defines the capability interfaces the batch engine is written
//! against: the [`LocationBackend`] trait for the remote location service,
//! the fault taxonomy ([`LocationError`]), and the wire-agnostic data model
//! for geocoding, reverse geocoding, and route calculation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Region used when the caller does not specify one.
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Represents a fault reported by the remote location service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationError {
    /// The service reported "too many requests"; the call may be retried.
    #[error("Throttled by location service{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Throttled {
        /// Optional message carried by the throttling response.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// An error occurred issuing the request (e.g., connectivity).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The service rejected the call for any other reason.
    #[error("Service Error: {0}")]
    ServiceError(String),
}

impl LocationError {
    /// Returns `true` when the fault is a transient throttling condition
    /// that the retry loop is allowed to absorb.
    #[must_use]
    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Region and credential selection for a remote call.
///
/// Credential-profile interpretation is entirely the backend's concern; the
/// batch engine only threads the context through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallContext {
    /// Service region; [`DEFAULT_REGION`] when unset.
    pub region: Option<String>,
    /// Named credential profile; backend default credentials when unset.
    pub profile: Option<String>,
}

impl CallContext {
    /// Create a context using the default region and credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective region for this call.
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

/// One address to geocode, with an optional caller-supplied identifier used
/// to correlate the result back to the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRecord {
    /// Caller-supplied correlation id.
    #[serde(rename = "waypointId", default)]
    pub waypoint_id: Option<String>,
    /// Free-form address text.
    pub address: String,
}

impl GeocodeRecord {
    /// Create a record without a correlation id.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self { waypoint_id: None, address: address.into() }
    }

    /// Attach a correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.waypoint_id = Some(id.into());
        self
    }
}

/// One coordinate pair to reverse-geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Caller-supplied correlation id.
    #[serde(rename = "waypointId", default)]
    pub waypoint_id: Option<String>,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub long: f64,
}

impl PositionRecord {
    /// Create a record without a correlation id.
    #[must_use]
    pub fn new(lat: f64, long: f64) -> Self {
        Self { waypoint_id: None, lat, long }
    }

    /// Attach a correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.waypoint_id = Some(id.into());
        self
    }

    /// The `[longitude, latitude]` pair the service expects.
    #[must_use]
    pub fn position(&self) -> [f64; 2] {
        [self.long, self.lat]
    }
}

/// Query for a text (forward geocoding) search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextQuery {
    /// Name of the place index to search.
    pub index_id: String,
    /// Address text to search for.
    pub text: String,
    /// Maximum number of result entries to return.
    pub max_results: u32,
    /// BCP-47 language tag for result labels.
    pub language: String,
}

impl TextQuery {
    /// Create a query with the fixed defaults (3 results, English labels).
    #[must_use]
    pub fn new(index_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index_id: index_id.into(),
            text: text.into(),
            max_results: 3,
            language: "en".to_string(),
        }
    }
}

/// Query for a position (reverse geocoding) search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionQuery {
    /// Name of the place index to search.
    pub index_id: String,
    /// `[longitude, latitude]` pair to look up.
    pub position: [f64; 2],
}

impl PositionQuery {
    /// Create a position query.
    #[must_use]
    pub fn new(index_id: impl Into<String>, position: [f64; 2]) -> Self {
        Self { index_id: index_id.into(), position }
    }
}

/// Geometry of a returned place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaceGeometry {
    /// `[longitude, latitude]` of the place, when the service returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<[f64; 2]>,
}

/// A place entry as returned by the location service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Place {
    /// Full address label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Place geometry.
    #[serde(default)]
    pub geometry: PlaceGeometry,
    /// Street number component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    /// Street name component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// City or town component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    /// Region (state/province) component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Country code component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Postal code component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// One entry of a text-search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextResult {
    /// The matched place.
    pub place: Place,
    /// Service-reported relevance score for the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// One entry of a position-search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PositionResult {
    /// The matched place.
    pub place: Place,
    /// Distance from the queried position, in the index's unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Response container for both search operations.
///
/// A response lacking the result container deserializes to an empty list;
/// callers treat an empty list as "not found", never as a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults<T> {
    /// Result entries, best match first.
    #[serde(rename = "Results", default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for SearchResults<T> {
    fn default() -> Self {
        Self { results: Vec::new() }
    }
}

impl<T> SearchResults<T> {
    /// Consume the response, yielding the best match if any.
    #[must_use]
    pub fn into_first(self) -> Option<T> {
        self.results.into_iter().next()
    }
}

/// A successful per-record outcome: the best match merged with the
/// originating record's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    /// Correlation id of the originating record; `null` when the caller
    /// supplied none.
    #[serde(rename = "waypointId")]
    pub waypoint_id: Option<String>,
    /// The result payload.
    #[serde(flatten)]
    pub result: T,
}

/// A geocoded address: text-search match plus correlation id.
pub type GeocodedAddress = Resolved<TextResult>;

/// A reverse-geocoded position: position-search match plus correlation id.
pub type ResolvedPosition = Resolved<PositionResult>;

/// Unit used for route distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    /// Kilometers (the service default for this system).
    #[default]
    Kilometers,
    /// Miles.
    Miles,
}

/// Mode of travel for route calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    /// Passenger car routing.
    Car,
    /// Truck routing (the default for this system).
    #[default]
    Truck,
    /// Pedestrian routing.
    Walking,
}

/// Truck-specific routing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TruckModeOptions {
    /// Route around ferries.
    pub avoid_ferries: bool,
    /// Route around toll roads.
    pub avoid_tolls: bool,
}

/// Fully constructed route-calculation request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteRequest {
    /// Name of the route calculator resource.
    pub calculator_name: String,
    /// Depart immediately rather than at a scheduled time.
    pub depart_now: bool,
    /// Unit for reported distances.
    pub distance_unit: DistanceUnit,
    /// Whether per-leg geometry is requested.
    pub include_leg_geometry: bool,
    /// Mode of travel.
    pub travel_mode: TravelMode,
    /// Truck options; only meaningful for [`TravelMode::Truck`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_mode_options: Option<TruckModeOptions>,
    /// `[longitude, latitude]` of the departure point.
    pub departure_position: [f64; 2],
    /// `[longitude, latitude]` of the destination.
    pub destination_position: [f64; 2],
    /// Intermediate stops as `[longitude, latitude]` pairs, in visit order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoint_positions: Option<Vec<[f64; 2]>>,
}

/// Summary of a calculated route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteSummary {
    /// Bounding box of the route as `[minLong, minLat, maxLong, maxLat]`.
    #[serde(rename = "RouteBBox", default, skip_serializing_if = "Option::is_none")]
    pub route_bbox: Option<Vec<f64>>,
    /// Provider of the underlying road network data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// Total route distance in [`RouteSummary::distance_unit`].
    pub distance: f64,
    /// Total travel time in seconds.
    pub duration_seconds: f64,
    /// Unit for `distance`.
    #[serde(default)]
    pub distance_unit: DistanceUnit,
}

/// Response container for route calculation.
///
/// A response lacking the summary container resolves to an absent result,
/// not a fault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// The route summary, when the service produced one.
    #[serde(rename = "Summary", default)]
    pub summary: Option<RouteSummary>,
}

/// A trait for the remote location service.
///
/// Implementations own wire format, authentication, and credential-profile
/// resolution. All implementations must be `Send + Sync` so concurrent
/// batch tasks can share one backend.
#[async_trait]
pub trait LocationBackend: Send + Sync {
    /// Reverse-geocode one coordinate pair.
    ///
    /// # Errors
    /// Returns a [`LocationError`] when the service faults; an empty result
    /// list is a successful "not found" response.
    async fn search_by_position(
        &self,
        query: &PositionQuery,
        ctx: &CallContext,
    ) -> Result<SearchResults<PositionResult>, LocationError>;

    /// Geocode one address text.
    ///
    /// # Errors
    /// Returns a [`LocationError`] when the service faults; an empty result
    /// list is a successful "not found" response.
    async fn search_by_text(
        &self,
        query: &TextQuery,
        ctx: &CallContext,
    ) -> Result<SearchResults<TextResult>, LocationError>;

    /// Calculate one route.
    ///
    /// # Errors
    /// Returns a [`LocationError`] when the service faults; a response with
    /// no summary is treated as an absent result by callers.
    async fn calculate_route(
        &self,
        request: &RouteRequest,
        ctx: &CallContext,
    ) -> Result<RouteResponse, LocationError>;
}
