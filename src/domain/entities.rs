/// Domain Entities - Driver presence and bookings
///
/// `DriverPresence` is the latest state a driver connection reported;
/// `Booking` is the read-only input of one dispatch pass.
///
/// Both are built from loosely-typed JSON. Parsing is lenient on purpose:
/// an unusable location is stored as absent and a booking without a usable
/// pickup point or vehicle type simply yields no `DispatchCriteria`, so
/// malformed input narrows matching instead of failing the caller.

use crate::domain::geo::GeoPoint;
use crate::shared::protocol::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Driver availability as reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    /// `"available"`, the only dispatchable status
    Available,
    /// `"unavailable"`
    Unavailable,
    /// Any other reported value, kept verbatim
    Other(String),
    /// No status field, or a non-string one
    Unknown,
}

impl DriverStatus {
    /// Status values are compared case-sensitively, like vehicle types
    pub fn parse(raw: &str) -> Self {
        match raw {
            "available" => DriverStatus::Available,
            "unavailable" => DriverStatus::Unavailable,
            other => DriverStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DriverStatus::Available => "available",
            DriverStatus::Unavailable => "unavailable",
            DriverStatus::Other(raw) => raw,
            DriverStatus::Unknown => "",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DriverStatus::Available)
    }
}

/// Latest reported state of one driver connection
#[derive(Debug, Clone, PartialEq)]
pub struct DriverPresence {
    /// Registry key; always equal to the connection that reported it
    pub connection_id: ConnectionId,
    pub driver_id: Option<String>,
    /// Absent until the first usable location report
    pub location: Option<GeoPoint>,
    pub vehicle_type: Option<String>,
    pub status: DriverStatus,
    /// Remaining fields of the report, opaque to dispatch
    pub extra: Map<String, Value>,
}

impl DriverPresence {
    /// Builds a presence record from a `driver-info` payload.
    ///
    /// Expected shape:
    /// `{"driverId", "location": {"coordinates": [lon, lat]}, "vehicleType", "status", ...}`.
    /// Non-object payloads produce a record with every field absent.
    pub fn from_report(connection_id: ConnectionId, data: Value) -> Self {
        let mut fields = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let driver_id = fields.remove("driverId").and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        let location = fields
            .remove("location")
            .and_then(|loc| loc.get("coordinates").and_then(GeoPoint::from_coordinates));

        let vehicle_type = fields.remove("vehicleType").and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        });

        let status = match fields.remove("status") {
            Some(Value::String(s)) => DriverStatus::parse(&s),
            _ => DriverStatus::Unknown,
        };

        // the hub owns the connection id, a client-supplied one is dropped
        fields.remove("socketId");
        fields.remove("connectionId");

        Self {
            connection_id,
            driver_id,
            location,
            vehicle_type,
            status,
            extra: fields,
        }
    }
}

/// A booking request, kept as the raw payload so it reaches drivers unmodified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Booking(Value);

impl Booking {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }

    pub fn into_payload(self) -> Value {
        self.0
    }

    /// Extracts what dispatch matches on, or `None` for a malformed booking
    pub fn criteria(&self) -> Option<DispatchCriteria<'_>> {
        let pickup = self
            .0
            .get("pickupLocation")?
            .get("coordinates")
            .and_then(GeoPoint::from_coordinates)?;
        let vehicle_type = self.0.get("vehicleType")?.as_str()?;

        Some(DispatchCriteria {
            pickup,
            vehicle_type,
        })
    }
}

/// The matchable view of a well-formed booking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchCriteria<'a> {
    pub pickup: GeoPoint,
    pub vehicle_type: &'a str,
}
