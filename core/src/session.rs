use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::directory::{self, Place};
use crate::providers::{GeolocationProvider, WeatherProvider};

pub const MAX_LOCATIONS: usize = 3;
/// The primary location keeps a fixed id for the whole session.
pub const PRIMARY_ID: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: String,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather: Option<WeatherSnapshot>,
    pub is_primary: bool,
}

impl Location {
    fn from_place(place: &Place, id: String, is_primary: bool, weather: Option<WeatherSnapshot>) -> Self {
        Self {
            id,
            name: place.name.to_string(),
            country: place.country.to_string(),
            country_code: place.country_code.to_string(),
            timezone: place.timezone.to_string(),
            latitude: place.latitude,
            longitude: place.longitude,
            weather,
            is_primary,
        }
    }
}

/// In-memory session: 1-3 locations (primary first), an optional pinned
/// reference time, and the theme flag. Mutators replace the location list
/// wholesale so a concurrent reader never observes a half-applied edit.
#[derive(Debug, Clone)]
pub struct Session {
    locations: Vec<Location>,
    custom_instant: Option<DateTime<Utc>>,
    theme_dark: bool,
    next_id: u64,
}

impl Session {
    fn with_primary(primary: Location) -> Self {
        Self {
            locations: vec![primary],
            custom_instant: None,
            theme_dark: false,
            next_id: 2,
        }
    }

    /// Startup chain: device coordinates, then the nearest directory place,
    /// then weather for those coordinates. Geolocation failure substitutes
    /// the fixed fallback place with no weather; the caller is expected to
    /// retry that weather fetch in the background and attach the result by
    /// id.
    pub fn bootstrap(geo: &dyn GeolocationProvider, weather: &dyn WeatherProvider) -> Self {
        match geo.current_coordinates() {
            Ok(coords) => {
                let place = directory::nearest(coords.latitude, coords.longitude);
                info!(
                    "geolocated via {} to {:.4},{:.4} -> {}",
                    geo.name(),
                    coords.latitude,
                    coords.longitude,
                    place.name
                );
                let snapshot = match weather.fetch(coords.latitude, coords.longitude) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        warn!("initial weather fetch failed: {}", e);
                        None
                    }
                };
                let mut primary =
                    Location::from_place(place, PRIMARY_ID.to_string(), true, snapshot);
                // Keep the device fix, not the city centroid
                primary.latitude = coords.latitude;
                primary.longitude = coords.longitude;
                Self::with_primary(primary)
            }
            Err(e) => {
                let place = directory::fallback();
                warn!("geolocation unavailable ({}), starting at {}", e, place.name);
                Self::with_primary(Location::from_place(
                    place,
                    PRIMARY_ID.to_string(),
                    true,
                    None,
                ))
            }
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn primary(&self) -> &Location {
        &self.locations[0]
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Appends a non-primary location and returns its fresh id. Silently
    /// ignored at capacity.
    pub fn add_location(&mut self, place: &Place, weather: Option<WeatherSnapshot>) -> Option<String> {
        if self.locations.len() >= MAX_LOCATIONS {
            debug!("add ignored, session already holds {} locations", MAX_LOCATIONS);
            return None;
        }
        let id = self.next_id.to_string();
        self.next_id += 1;

        let mut locations = self.locations.clone();
        locations.push(Location::from_place(place, id.clone(), false, weather));
        self.locations = locations;
        info!("added location {} ({})", place.name, id);
        Some(id)
    }

    /// Removes a non-primary location. The primary is protected; removing
    /// it or an unknown id is a no-op.
    pub fn remove_location(&mut self, id: &str) -> bool {
        if id == PRIMARY_ID {
            debug!("refusing to remove primary location");
            return false;
        }
        if !self.locations.iter().any(|l| l.id == id) {
            return false;
        }
        self.locations = self
            .locations
            .iter()
            .filter(|l| l.id != id)
            .cloned()
            .collect();
        info!("removed location {}", id);
        true
    }

    /// Applies a weather result to the location it was fetched for,
    /// matched by id. A result arriving after the location was removed is
    /// dropped on the floor.
    pub fn attach_weather(&mut self, id: &str, snapshot: WeatherSnapshot) -> bool {
        if !self.locations.iter().any(|l| l.id == id) {
            debug!("discarding weather for departed location {}", id);
            return false;
        }
        self.locations = self
            .locations
            .iter()
            .map(|l| {
                if l.id == id {
                    let mut updated = l.clone();
                    updated.weather = Some(snapshot.clone());
                    updated
                } else {
                    l.clone()
                }
            })
            .collect();
        true
    }

    /// The instant cards should render: the pinned reference time if the
    /// user set one, otherwise the tick passed in.
    pub fn reference_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.custom_instant.unwrap_or(now)
    }

    pub fn custom_instant(&self) -> Option<DateTime<Utc>> {
        self.custom_instant
    }

    pub fn set_custom_instant(&mut self, instant: DateTime<Utc>) {
        self.custom_instant = Some(instant);
    }

    pub fn clear_custom_instant(&mut self) {
        self.custom_instant = None;
    }

    pub fn theme_dark(&self) -> bool {
        self.theme_dark
    }

    pub fn set_theme_dark(&mut self, dark: bool) {
        self.theme_dark = dark;
    }

    /// Flips the theme and returns the new value.
    pub fn toggle_theme(&mut self) -> bool {
        self.theme_dark = !self.theme_dark;
        self.theme_dark
    }
}
