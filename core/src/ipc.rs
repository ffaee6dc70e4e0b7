use serde::{Deserialize, Serialize};

use crate::view::{CardView, PlaceView};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum IpcCommand {
    /// Render the dashboard at the current (or pinned) reference time.
    GetDashboard,
    /// Search the location directory.
    Search(String),
    /// Add the best directory match for the query as a new card.
    AddLocation(String),
    /// Remove a card by location id.
    RemoveLocation(String),
    /// Pin the reference time: a wall clock ("YYYY-MM-DD", "HH:MM") read in
    /// the primary location's timezone.
    SetTime { date: String, time: String },
    /// Drop the pinned time and follow the live clock again.
    ResetTime,
    ToggleTheme,
    Heartbeat,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum IpcResponse {
    Ok,
    Dashboard {
        theme: String,
        /// True when a pinned reference time is active.
        custom_time: bool,
        cards: Vec<CardView>,
    },
    Places(Vec<PlaceView>),
    Error(String),
}
