//! Real Las Vegas locations for geographic waypoints.
//!
//! Coordinates sourced from OpenStreetMap via Overpass API.

use vrp_request::Waypoint;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    /// A waypoint at this location, identified by its name.
    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.name).at(self.lat, self.lon)
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const WYNN: Location = Location::new("Wynn Las Vegas", 36.1263781, -115.1658180);
pub const MGM_GRAND: Location = Location::new("MGM Grand", 36.1023654, -115.1688720);

// ============================================================================
// Stops
// ============================================================================

pub const STOPS: &[Location] = &[
    Location::new("Hard Rock Cafe", 36.1041592, -115.1722166),
    Location::new("Sinatra", 36.1300035, -115.1654850),
    Location::new("Brooklyn Bowl", 36.1175388, -115.1695094),
    Location::new("Rao's", 36.1163982, -115.1763053),
    Location::new("Islander's Grill", 36.0335058, -114.9856162),
    Location::new("Roberto's Taco Shop", 36.1452953, -115.0478347),
];
