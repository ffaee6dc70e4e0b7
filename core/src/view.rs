//! Turns the session into displayable cards. Everything here is derived on
//! each render tick and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::directory::Place;
use crate::session::Session;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub temperature_c: f64,
    pub condition: String,
    pub icon: String,
    pub description: String,
}

/// A directory search hit, as offered to the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaceView {
    pub name: String,
    pub country: String,
    pub flag: String,
    pub timezone: String,
}

impl PlaceView {
    pub fn from_place(place: &Place) -> Self {
        Self {
            name: place.name.to_string(),
            country: place.country.to_string(),
            flag: flag_emoji(place.country_code),
            timezone: place.timezone.to_string(),
        }
    }
}

/// One dashboard card, fully rendered.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub country: String,
    pub flag: String,
    pub timezone: String,
    pub is_primary: bool,
    pub time_12: String,
    pub date_short: String,
    pub time_24: String,
    pub date_iso: String,
    pub utc_offset: String,
    pub day_label: String,
    pub is_day: bool,
    /// Relative to the primary location; absent on the primary card.
    pub difference: Option<String>,
    pub weather: Option<WeatherView>,
}

/// Regional-indicator flag for an ISO 3166 alpha-2 code.
pub fn flag_emoji(country_code: &str) -> String {
    country_code
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .filter_map(|c| char::from_u32(0x1F1E6 + (c.to_ascii_uppercase() as u32 - 'A' as u32)))
        .collect()
}

/// Renders every session location at `instant` (the pinned time, if one is
/// set, already folded in by the caller via `Session::reference_instant`).
pub fn render_cards(session: &Session, instant: DateTime<Utc>) -> Vec<CardView> {
    let primary_tz = session.primary().timezone.clone();

    session
        .locations()
        .iter()
        .map(|loc| {
            let formatted = clock::format_instant(instant, &loc.timezone);
            let difference = (!loc.is_primary)
                .then(|| clock::time_difference_label(instant, &primary_tz, &loc.timezone));
            CardView {
                id: loc.id.clone(),
                name: loc.name.clone(),
                country: loc.country.clone(),
                flag: flag_emoji(&loc.country_code),
                timezone: loc.timezone.clone(),
                is_primary: loc.is_primary,
                time_12: formatted.time_12,
                date_short: formatted.date_short,
                time_24: formatted.time_24,
                date_iso: formatted.date_iso,
                utc_offset: formatted.utc_offset,
                day_label: formatted.day_label,
                is_day: clock::is_daytime(instant, &loc.timezone),
                difference,
                weather: loc.weather.as_ref().map(|w| WeatherView {
                    temperature_c: w.temperature_c,
                    condition: w.condition.clone(),
                    icon: w.icon.clone(),
                    description: w.description.clone(),
                }),
            }
        })
        .collect()
}
