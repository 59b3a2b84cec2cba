/// EligibilityFilter - Which drivers may receive a booking
///
/// A driver is eligible when all three hold:
/// 1. status is `available`
/// 2. vehicle type equals the booking's (case-sensitive unless configured)
/// 3. a location is known and lies within `radius_km` of the pickup point
///
/// Checks run cheapest first; the order is not observable.

use crate::domain::entities::{DispatchCriteria, DriverPresence};
use crate::domain::geo::within_radius;
use std::str::FromStr;

/// Fixed match radius around the pickup point
pub const MATCH_RADIUS_KM: f64 = 1000.0;

/// How driver and booking vehicle types are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleTypeMatch {
    /// Byte-for-byte equality (`"Sedan" != "sedan"`)
    #[default]
    Exact,
    /// ASCII case-insensitive equality
    CaseInsensitive,
}

impl VehicleTypeMatch {
    #[inline]
    pub fn matches(self, driver: &str, booking: &str) -> bool {
        match self {
            VehicleTypeMatch::Exact => driver == booking,
            VehicleTypeMatch::CaseInsensitive => driver.eq_ignore_ascii_case(booking),
        }
    }
}

impl FromStr for VehicleTypeMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(VehicleTypeMatch::Exact),
            "case-insensitive" => Ok(VehicleTypeMatch::CaseInsensitive),
            other => Err(format!("unknown vehicle type match policy '{}'", other)),
        }
    }
}

/// Construction-time matching configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub radius_km: f64,
    pub vehicle_type_match: VehicleTypeMatch,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            radius_km: MATCH_RADIUS_KM,
            vehicle_type_match: VehicleTypeMatch::Exact,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    policy: MatchPolicy,
}

impl EligibilityFilter {
    /// Filter with the default 1000 km, case-sensitive policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    #[inline]
    pub fn is_eligible(&self, driver: &DriverPresence, criteria: &DispatchCriteria<'_>) -> bool {
        if !driver.status.is_available() {
            return false;
        }

        let type_matches = driver
            .vehicle_type
            .as_deref()
            .is_some_and(|t| self.policy.vehicle_type_match.matches(t, criteria.vehicle_type));
        if !type_matches {
            return false;
        }

        driver
            .location
            .is_some_and(|loc| within_radius(criteria.pickup, loc, self.policy.radius_km))
    }
}
