use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use worldclock_core::config::Config;
use worldclock_core::ipc::{IpcCommand, IpcResponse};
use worldclock_core::providers::{
    ConfiguredGeolocator, DisabledGeolocator, GeolocationProvider, IpGeolocator,
    MockWeatherProvider, WeatherProvider, WttrProvider,
};
use worldclock_core::session::{Session, MAX_LOCATIONS};
use worldclock_core::view::PlaceView;
use worldclock_core::{clock, directory, view};

mod logging;
mod state;

use crate::logging::EventLogger;
use crate::state::ThemeStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "/etc/worldclock/config.toml")]
    config: PathBuf,

    /// Deterministic mock providers, no network
    #[arg(long)]
    dry_run: bool,
}

const SOCKET_PATH: &str = "/tmp/worldclock.sock";

fn build_geolocator(config: &Config, dry_run: bool) -> Box<dyn GeolocationProvider> {
    if dry_run {
        info!("Using configured London position (Dry Run)");
        return Box::new(ConfiguredGeolocator::new(51.5074, -0.1278));
    }
    match config.location.method.as_str() {
        "manual" => match (config.location.latitude, config.location.longitude) {
            (Some(lat), Some(lon)) => Box::new(ConfiguredGeolocator::new(lat, lon)),
            _ => {
                warn!("manual location method without coordinates, treating as off");
                Box::new(DisabledGeolocator)
            }
        },
        "off" => Box::new(DisabledGeolocator),
        "ip" => Box::new(IpGeolocator::new()),
        other => {
            warn!("unknown location method '{}', using ip lookup", other);
            Box::new(IpGeolocator::new())
        }
    }
}

fn build_weather_provider(config: &Config, dry_run: bool) -> Arc<dyn WeatherProvider> {
    if dry_run {
        info!("Using Mock Weather Provider (Dry Run)");
        return Arc::new(MockWeatherProvider);
    }
    match config.weather.method.as_str() {
        "mock" => Arc::new(MockWeatherProvider),
        "wttr" => Arc::new(WttrProvider),
        other => {
            warn!("unknown weather method '{}', using wttr.in", other);
            Arc::new(WttrProvider)
        }
    }
}

/// Fire-and-forget weather fetch. The result is applied to the location by
/// id; if the location was removed in the meantime the result is dropped.
fn spawn_weather_fetch(
    session: Arc<Mutex<Session>>,
    provider: Arc<dyn WeatherProvider>,
    id: String,
    latitude: f64,
    longitude: f64,
) {
    tokio::spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || provider.fetch(latitude, longitude)).await;
        match result {
            Ok(Ok(snapshot)) => {
                session.lock().unwrap().attach_weather(&id, snapshot);
            }
            Ok(Err(e)) => warn!("weather fetch for location {} failed: {}", id, e),
            Err(e) => error!("weather task failed: {}", e),
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let args = Args::parse();
    info!("Starting worldclock daemon...");

    let config = if args.config.exists() {
        Config::load_from_file(&args.config).context("Failed to load config")?
    } else {
        warn!("Config file not found at {:?}, using defaults", args.config);
        Config::default()
    };

    let geolocator = build_geolocator(&config, args.dry_run);
    let weather = build_weather_provider(&config, args.dry_run);
    info!(
        "Providers: geolocation={}, weather={}",
        geolocator.name(),
        weather.name()
    );

    // Init chain: coordinates -> nearest place -> weather
    let mut session = Session::bootstrap(geolocator.as_ref(), weather.as_ref());

    let theme_store = Arc::new(ThemeStore::new());
    let dark = theme_store
        .load()
        .unwrap_or(config.general.theme == "dark");
    session.set_theme_dark(dark);

    let session = Arc::new(Mutex::new(session));
    let logger = Arc::new(EventLogger::new());

    // Fallback path left the primary without weather; retry in the
    // background and attach by id so the card fills in when it lands.
    {
        let s = session.lock().unwrap();
        let primary = s.primary();
        if primary.weather.is_none() {
            info!("primary has no weather yet, fetching in background");
            spawn_weather_fetch(
                session.clone(),
                weather.clone(),
                primary.id.clone(),
                primary.latitude,
                primary.longitude,
            );
        }
    }

    if std::path::Path::new(SOCKET_PATH).exists() {
        std::fs::remove_file(SOCKET_PATH).ok();
    }
    let listener =
        tokio::net::UnixListener::bind(SOCKET_PATH).context("Failed to bind IPC socket")?;

    info!("Daemon running. Listening on {}", SOCKET_PATH);

    let refresh_secs = config.weather.refresh_minutes * 60;
    let mut tick_count: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick_count += 1;

                // Periodic weather refresh for every card
                if tick_count % refresh_secs == 0 {
                    let targets: Vec<(String, f64, f64)> = {
                        let s = session.lock().unwrap();
                        s.locations()
                            .iter()
                            .map(|l| (l.id.clone(), l.latitude, l.longitude))
                            .collect()
                    };
                    info!("Refreshing weather for {} locations", targets.len());
                    for (id, lat, lon) in targets {
                        spawn_weather_fetch(session.clone(), weather.clone(), id, lat, lon);
                    }
                }
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let session_ref = session.clone();
                        let weather_ref = weather.clone();
                        let store_ref = theme_store.clone();
                        let logger_ref = logger.clone();

                        tokio::spawn(async move {
                            handle_connection(stream, session_ref, weather_ref, store_ref, logger_ref).await;
                        });
                    }
                    Err(e) => error!("IPC Accept Error: {}", e),
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: tokio::net::UnixStream,
    session: Arc<Mutex<Session>>,
    weather: Arc<dyn WeatherProvider>,
    theme_store: Arc<ThemeStore>,
    logger: Arc<EventLogger>,
) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut buf = [0; 1024];

    match stream.read(&mut buf).await {
        Ok(n) if n > 0 => {
            if let Ok(cmd) = serde_json::from_slice::<IpcCommand>(&buf[..n]) {
                if !matches!(cmd, IpcCommand::GetDashboard | IpcCommand::Heartbeat) {
                    info!("Received command: {:?}", cmd);
                }

                let response = dispatch(cmd, &session, &weather, &theme_store, &logger).await;

                match serde_json::to_vec(&response) {
                    Ok(resp_bytes) => {
                        stream.write_all(&resp_bytes).await.ok();
                    }
                    Err(e) => error!("Failed to serialize response: {}", e),
                }
            }
        }
        _ => {}
    }
}

async fn dispatch(
    cmd: IpcCommand,
    session: &Arc<Mutex<Session>>,
    weather: &Arc<dyn WeatherProvider>,
    theme_store: &Arc<ThemeStore>,
    logger: &Arc<EventLogger>,
) -> IpcResponse {
    match cmd {
        IpcCommand::GetDashboard | IpcCommand::Heartbeat => {
            let s = session.lock().unwrap();
            let instant = s.reference_instant(Utc::now());
            IpcResponse::Dashboard {
                theme: if s.theme_dark() { "dark" } else { "light" }.to_string(),
                custom_time: s.custom_instant().is_some(),
                cards: view::render_cards(&s, instant),
            }
        }

        IpcCommand::Search(query) => IpcResponse::Places(
            directory::search(&query)
                .into_iter()
                .map(PlaceView::from_place)
                .collect(),
        ),

        IpcCommand::AddLocation(query) => {
            let Some(place) = directory::search(&query).into_iter().next() else {
                return IpcResponse::Error(format!("no place matches '{}'", query));
            };

            // Capacity is a silent no-op, checked before spending a fetch
            if session.lock().unwrap().locations().len() >= MAX_LOCATIONS {
                return IpcResponse::Ok;
            }

            let provider = weather.clone();
            let (lat, lon) = (place.latitude, place.longitude);
            let snapshot = match tokio::task::spawn_blocking(move || provider.fetch(lat, lon)).await
            {
                Ok(Ok(snap)) => Some(snap),
                Ok(Err(e)) => {
                    warn!("weather for new location failed: {}", e);
                    None
                }
                Err(e) => {
                    error!("weather task failed: {}", e);
                    None
                }
            };

            let mut s = session.lock().unwrap();
            if s.add_location(place, snapshot).is_some() {
                logger.log("add", place.name, s.locations().len()).ok();
            }
            IpcResponse::Ok
        }

        IpcCommand::RemoveLocation(id) => {
            let mut s = session.lock().unwrap();
            if s.remove_location(&id) {
                logger.log("remove", &id, s.locations().len()).ok();
            }
            IpcResponse::Ok
        }

        IpcCommand::SetTime { date, time } => {
            let tz = session.lock().unwrap().primary().timezone.clone();
            match clock::resolve_wall_clock(&date, &time, &tz) {
                Ok(instant) => {
                    let mut s = session.lock().unwrap();
                    s.set_custom_instant(instant);
                    logger
                        .log("set_time", &format!("{} {}", date, time), s.locations().len())
                        .ok();
                    IpcResponse::Ok
                }
                Err(e) => IpcResponse::Error(e.to_string()),
            }
        }

        IpcCommand::ResetTime => {
            let mut s = session.lock().unwrap();
            s.clear_custom_instant();
            logger.log("reset_time", "", s.locations().len()).ok();
            IpcResponse::Ok
        }

        IpcCommand::ToggleTheme => {
            let (dark, count) = {
                let mut s = session.lock().unwrap();
                (s.toggle_theme(), s.locations().len())
            };
            theme_store.save(dark);
            logger
                .log("theme", if dark { "dark" } else { "light" }, count)
                .ok();
            IpcResponse::Ok
        }
    }
}
