//! External collaborators: geolocation and weather. Both are best-effort;
//! callers must render correctly when a provider fails.

use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::session::WeatherSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("location access denied")]
    PermissionDenied,
    #[error("geolocation timed out")]
    Timeout,
    #[error("geolocation unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("network error: {0}")]
    Network(String),
    #[error("weather provider error: {0}")]
    Provider(String),
}

pub trait GeolocationProvider: Send + Sync {
    fn current_coordinates(&self) -> Result<Coordinates, GeoError>;
    fn name(&self) -> &str;
}

pub trait WeatherProvider: Send + Sync {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, WeatherError>;
    fn name(&self) -> &str;
}

const FETCH_TIMEOUT_SECS: u64 = 10;
/// A cached fix younger than this is reused instead of re-resolving.
const CACHE_MAX_AGE: Duration = Duration::from_secs(300);

// curl exit code for --max-time expiry
const CURL_TIMEOUT_EXIT: i32 = 28;

fn curl(url: &str) -> Result<String, (i32, String)> {
    let output = Command::new("curl")
        .arg("-s")
        .arg("--max-time")
        .arg(FETCH_TIMEOUT_SECS.to_string())
        .arg(url)
        .output()
        .map_err(|e| (-1, e.to_string()))?;
    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err((code, String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// IP-based lookup via ip-api.com, with a short-lived cached fix.
pub struct IpGeolocator {
    cache: Mutex<Option<(Instant, Coordinates)>>,
}

impl IpGeolocator {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
        }
    }
}

impl Default for IpGeolocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeolocationProvider for IpGeolocator {
    fn current_coordinates(&self) -> Result<Coordinates, GeoError> {
        if let Some((fetched_at, coords)) = *self.cache.lock().unwrap() {
            if fetched_at.elapsed() <= CACHE_MAX_AGE {
                debug!("reusing cached position fix");
                return Ok(coords);
            }
        }

        let body = curl("http://ip-api.com/line/?fields=status,lat,lon").map_err(
            |(code, err)| {
                if code == CURL_TIMEOUT_EXIT {
                    GeoError::Timeout
                } else {
                    GeoError::Unavailable(err)
                }
            },
        )?;

        let mut lines = body.lines();
        if lines.next().map(str::trim) != Some("success") {
            return Err(GeoError::Unavailable("lookup rejected".to_string()));
        }
        let latitude = lines
            .next()
            .and_then(|l| l.trim().parse::<f64>().ok())
            .ok_or_else(|| GeoError::Unavailable("malformed response".to_string()))?;
        let longitude = lines
            .next()
            .and_then(|l| l.trim().parse::<f64>().ok())
            .ok_or_else(|| GeoError::Unavailable("malformed response".to_string()))?;

        let coords = Coordinates { latitude, longitude };
        info!("resolved position {:.4},{:.4}", latitude, longitude);
        *self.cache.lock().unwrap() = Some((Instant::now(), coords));
        Ok(coords)
    }

    fn name(&self) -> &str {
        "ip-api"
    }
}

/// Fixed coordinates from configuration.
pub struct ConfiguredGeolocator {
    coords: Coordinates,
}

impl ConfiguredGeolocator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coords: Coordinates { latitude, longitude },
        }
    }
}

impl GeolocationProvider for ConfiguredGeolocator {
    fn current_coordinates(&self) -> Result<Coordinates, GeoError> {
        Ok(self.coords)
    }

    fn name(&self) -> &str {
        "configured"
    }
}

/// The user opted out of location access.
pub struct DisabledGeolocator;

impl GeolocationProvider for DisabledGeolocator {
    fn current_coordinates(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::PermissionDenied)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Live weather from wttr.in (`?format=%t|%C` yields "+13°C|Partly cloudy").
pub struct WttrProvider;

impl WeatherProvider for WttrProvider {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!(
            "https://wttr.in/{:.4},{:.4}?format=%t|%C",
            latitude, longitude
        );
        let body = curl(&url).map_err(|(_, err)| WeatherError::Network(err))?;
        parse_wttr(body.trim())
    }

    fn name(&self) -> &str {
        "wttr.in"
    }
}

fn parse_wttr(line: &str) -> Result<WeatherSnapshot, WeatherError> {
    let (temp, condition) = line
        .split_once('|')
        .ok_or_else(|| WeatherError::Provider(format!("unexpected response '{}'", line)))?;
    let temperature_c = temp
        .trim()
        .trim_end_matches("°C")
        .trim_start_matches('+')
        .parse::<f64>()
        .map_err(|_| WeatherError::Provider(format!("bad temperature '{}'", temp)))?;
    let condition = condition.trim();
    if condition.is_empty() {
        return Err(WeatherError::Provider("empty condition".to_string()));
    }
    Ok(WeatherSnapshot {
        temperature_c,
        condition: condition.to_string(),
        icon: condition_icon(condition).to_string(),
        description: condition.to_lowercase(),
    })
}

/// Maps a free-text condition onto OpenWeatherMap-style icon codes.
fn condition_icon(condition: &str) -> &'static str {
    let c = condition.to_lowercase();
    if c.contains("thunder") {
        "11d"
    } else if c.contains("snow") || c.contains("sleet") {
        "13d"
    } else if c.contains("rain") || c.contains("drizzle") || c.contains("shower") {
        "10d"
    } else if c.contains("partly") {
        "02d"
    } else if c.contains("cloud") || c.contains("overcast") {
        "03d"
    } else if c.contains("mist") || c.contains("fog") || c.contains("haze") {
        "50d"
    } else if c.contains("sun") || c.contains("clear") {
        "01d"
    } else {
        "02d"
    }
}

/// Deterministic stand-in for the real provider: the snapshot is seeded
/// from the coordinates so dry runs and tests are stable.
pub struct MockWeatherProvider;

const MOCK_CONDITIONS: &[(&str, &str)] = &[
    ("Clear", "01d"),
    ("Cloudy", "03d"),
    ("Partly Cloudy", "02d"),
    ("Rainy", "10d"),
];

impl WeatherProvider for MockWeatherProvider {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, WeatherError> {
        let seed = latitude.to_bits() ^ longitude.to_bits().rotate_left(17);
        let temperature_c = (5 + (seed % 31)) as f64;
        let (condition, icon) = MOCK_CONDITIONS[((seed >> 8) % 4) as usize];
        Ok(WeatherSnapshot {
            temperature_c,
            condition: condition.to_string(),
            icon: icon.to_string(),
            description: "pleasant weather".to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wttr_line_parses() {
        let snap = parse_wttr("+13°C|Partly cloudy").unwrap();
        assert_eq!(snap.temperature_c, 13.0);
        assert_eq!(snap.condition, "Partly cloudy");
        assert_eq!(snap.icon, "02d");
        assert_eq!(snap.description, "partly cloudy");
    }

    #[test]
    fn wttr_negative_temperature() {
        let snap = parse_wttr("-2°C|Light snow").unwrap();
        assert_eq!(snap.temperature_c, -2.0);
        assert_eq!(snap.icon, "13d");
    }

    #[test]
    fn wttr_garbage_is_a_provider_error() {
        assert!(parse_wttr("Unknown location").is_err());
        assert!(parse_wttr("warm|Sunny").is_err());
        assert!(parse_wttr("+10°C|").is_err());
    }

    #[test]
    fn icon_mapping_buckets() {
        assert_eq!(condition_icon("Clear"), "01d");
        assert_eq!(condition_icon("Sunny"), "01d");
        assert_eq!(condition_icon("Partly cloudy"), "02d");
        assert_eq!(condition_icon("Overcast"), "03d");
        assert_eq!(condition_icon("Patchy rain nearby"), "10d");
        assert_eq!(condition_icon("Thundery outbreaks"), "11d");
        assert_eq!(condition_icon("Fog"), "50d");
    }

    #[test]
    fn mock_weather_is_deterministic() {
        let a = MockWeatherProvider.fetch(51.5074, -0.1278).unwrap();
        let b = MockWeatherProvider.fetch(51.5074, -0.1278).unwrap();
        assert_eq!(a, b);
        assert!((5.0..36.0).contains(&a.temperature_c));
    }

    #[test]
    fn disabled_geolocator_denies() {
        assert!(matches!(
            DisabledGeolocator.current_coordinates(),
            Err(GeoError::PermissionDenied)
        ));
    }

    #[test]
    fn configured_geolocator_returns_fixed_coords() {
        let geo = ConfiguredGeolocator::new(35.6762, 139.6503);
        let c = geo.current_coordinates().unwrap();
        assert_eq!(c.latitude, 35.6762);
        assert_eq!(c.longitude, 139.6503);
    }
}
