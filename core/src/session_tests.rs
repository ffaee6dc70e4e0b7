use chrono::{TimeZone, Utc};

use crate::clock;
use crate::directory;
use crate::providers::{
    ConfiguredGeolocator, DisabledGeolocator, GeoError, GeolocationProvider, MockWeatherProvider,
    WeatherError, WeatherProvider,
};
use crate::session::{Session, WeatherSnapshot, MAX_LOCATIONS, PRIMARY_ID};

struct FailingWeather;

impl WeatherProvider for FailingWeather {
    fn fetch(&self, _latitude: f64, _longitude: f64) -> Result<WeatherSnapshot, WeatherError> {
        Err(WeatherError::Network("unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct TimingOutGeo;

impl GeolocationProvider for TimingOutGeo {
    fn current_coordinates(&self) -> Result<crate::providers::Coordinates, GeoError> {
        Err(GeoError::Timeout)
    }

    fn name(&self) -> &str {
        "timing-out"
    }
}

fn snapshot(condition: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: 18.0,
        condition: condition.to_string(),
        icon: "01d".to_string(),
        description: condition.to_lowercase(),
    }
}

#[test]
fn denied_geolocation_falls_back_to_london() {
    let session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let primary = session.primary();
    assert_eq!(primary.name, "London");
    assert_eq!(primary.timezone, "Europe/London");
    assert_eq!(primary.id, PRIMARY_ID);
    assert!(primary.is_primary);
    // fallback path defers weather to the background retry
    assert!(primary.weather.is_none());
    assert_eq!(session.locations().len(), 1);
}

#[test]
fn timed_out_geolocation_also_falls_back() {
    let session = Session::bootstrap(&TimingOutGeo, &MockWeatherProvider);
    assert_eq!(session.primary().name, "London");
}

#[test]
fn successful_geolocation_resolves_nearest_place_and_weather() {
    let geo = ConfiguredGeolocator::new(35.7, 139.7);
    let session = Session::bootstrap(&geo, &MockWeatherProvider);
    let primary = session.primary();
    assert_eq!(primary.name, "Tokyo");
    assert!(primary.weather.is_some());
    // the device fix is kept, not the directory centroid
    assert_eq!(primary.latitude, 35.7);
    assert_eq!(primary.longitude, 139.7);
}

#[test]
fn weather_failure_still_yields_a_primary() {
    let geo = ConfiguredGeolocator::new(51.5, -0.1);
    let session = Session::bootstrap(&geo, &FailingWeather);
    assert_eq!(session.primary().name, "London");
    assert!(session.primary().weather.is_none());
}

#[test]
fn add_and_remove_lifecycle() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let tokyo = directory::search("Tokyo")[0];

    let id = session.add_location(tokyo, Some(snapshot("Clear"))).unwrap();
    assert_eq!(session.locations().len(), 2);
    let added = session.location(&id).unwrap();
    assert!(!added.is_primary);
    assert_ne!(added.id, PRIMARY_ID);
    assert_eq!(added.name, "Tokyo");

    // primary is protected
    assert!(!session.remove_location(PRIMARY_ID));
    assert_eq!(session.locations().len(), 2);

    assert!(session.remove_location(&id));
    assert_eq!(session.locations().len(), 1);
    assert!(session.location(&id).is_none());
}

#[test]
fn added_location_ids_are_unique() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let paris = directory::search("Paris")[0];
    let tokyo = directory::search("Tokyo")[0];

    let a = session.add_location(paris, None).unwrap();
    assert!(session.remove_location(&a));
    let b = session.add_location(tokyo, None).unwrap();
    assert_ne!(a, b);
}

#[test]
fn capacity_is_capped_at_three() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let paris = directory::search("Paris")[0];
    let tokyo = directory::search("Tokyo")[0];
    let sydney = directory::search("Sydney")[0];

    assert!(session.add_location(paris, None).is_some());
    assert!(session.add_location(tokyo, None).is_some());
    assert_eq!(session.locations().len(), MAX_LOCATIONS);

    let before: Vec<String> = session.locations().iter().map(|l| l.id.clone()).collect();
    assert!(session.add_location(sydney, None).is_none());
    let after: Vec<String> = session.locations().iter().map(|l| l.id.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn weather_attaches_by_identity() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    assert!(session.attach_weather(PRIMARY_ID, snapshot("Cloudy")));
    assert_eq!(
        session.primary().weather.as_ref().unwrap().condition,
        "Cloudy"
    );
}

#[test]
fn stale_weather_for_removed_location_is_discarded() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let tokyo = directory::search("Tokyo")[0];
    let id = session.add_location(tokyo, None).unwrap();
    assert!(session.remove_location(&id));

    // the fetch raced with the removal; its result must vanish silently
    assert!(!session.attach_weather(&id, snapshot("Rainy")));
    assert_eq!(session.locations().len(), 1);
}

#[test]
fn custom_instant_overrides_the_tick() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let pinned = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

    assert_eq!(session.reference_instant(now), now);
    session.set_custom_instant(pinned);
    assert_eq!(session.reference_instant(now), pinned);
    assert!(session.custom_instant().is_some());
    session.clear_custom_instant();
    assert_eq!(session.reference_instant(now), now);
}

#[test]
fn pinned_wall_clock_tracks_dst_of_target_date() {
    // The converter flow: the same primary wall clock pinned in January vs
    // July must produce different UTC offsets for a DST-observing zone.
    let session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    let tz = &session.primary().timezone;

    let winter = clock::resolve_wall_clock("2024-01-15", "09:30", tz).unwrap();
    let summer = clock::resolve_wall_clock("2024-07-15", "09:30", tz).unwrap();

    let winter_offset = clock::format_instant(winter, tz).utc_offset;
    let summer_offset = clock::format_instant(summer, tz).utc_offset;
    assert_eq!(winter_offset, "+00:00");
    assert_eq!(summer_offset, "+01:00");
    assert_ne!(winter - summer, chrono::Duration::zero());
}

#[test]
fn theme_toggles_and_sets() {
    let mut session = Session::bootstrap(&DisabledGeolocator, &MockWeatherProvider);
    assert!(!session.theme_dark());
    assert!(session.toggle_theme());
    assert!(!session.toggle_theme());
    session.set_theme_dark(true);
    assert!(session.theme_dark());
}
