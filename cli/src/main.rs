use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use worldclock_core::ipc::{IpcCommand, IpcResponse};
use worldclock_core::view::CardView;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard once
    Status,
    /// Redraw the dashboard every second
    Watch,
    /// Search the location directory
    Search { query: String },
    /// Add the best match for a query as a new card
    Add { query: String },
    /// Remove a location card by id
    Remove { id: String },
    /// Pin the reference time: a wall clock in the primary location
    SetTime { date: String, time: String },
    /// Follow the live clock again
    Reset,
    /// Toggle dark mode
    Theme,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Status => IpcCommand::GetDashboard,
        Commands::Watch => return watch().await,
        Commands::Search { query } => IpcCommand::Search(query),
        Commands::Add { query } => IpcCommand::AddLocation(query),
        Commands::Remove { id } => IpcCommand::RemoveLocation(id),
        Commands::SetTime { date, time } => IpcCommand::SetTime { date, time },
        Commands::Reset => IpcCommand::ResetTime,
        Commands::Theme => IpcCommand::ToggleTheme,
    };

    let response = send_ipc(command).await?;
    print_response(&response);
    Ok(())
}

async fn watch() -> Result<()> {
    loop {
        let response = send_ipc(IpcCommand::GetDashboard).await?;
        // clear screen, cursor home
        print!("\x1B[2J\x1B[H");
        print_response(&response);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn send_ipc(cmd: IpcCommand) -> Result<IpcResponse> {
    let socket_path = "/tmp/worldclock.sock";
    let mut stream = UnixStream::connect(socket_path)
        .await
        .context("Could not connect to daemon. Is it running?")?;

    let bytes = serde_json::to_vec(&cmd)?;
    stream.write_all(&bytes).await?;

    let mut buf = [0; 8192];
    let n = stream.read(&mut buf).await?;
    anyhow::ensure!(n > 0, "No response from daemon");
    Ok(serde_json::from_slice(&buf[..n])?)
}

fn print_response(response: &IpcResponse) {
    match response {
        IpcResponse::Ok => println!("OK"),
        IpcResponse::Error(e) => eprintln!("Error: {}", e),
        IpcResponse::Dashboard { theme, custom_time, cards } => {
            println!("--- World Clock ---");
            println!("Theme:       {}", theme);
            println!(
                "Reference:   {}",
                if *custom_time { "pinned" } else { "live" }
            );
            for card in cards {
                print_card(card);
            }
            if *custom_time {
                println!();
                println!("Run 'worldclock reset' to follow the live clock again.");
            }
        }
        IpcResponse::Places(places) => {
            if places.is_empty() {
                println!("No matches.");
                return;
            }
            for p in places {
                println!("{}  {:<16} {:<20} {}", p.flag, p.name, p.country, p.timezone);
            }
        }
    }
}

fn print_card(card: &CardView) {
    let marker = if card.is_primary { " [primary]" } else { "" };
    println!();
    println!(
        "{}  {}, {}{}  (id {})",
        card.flag, card.name, card.country, marker, card.id
    );
    println!(
        "  {:<14} {}",
        card.time_12,
        if card.is_day { "Day" } else { "Night" }
    );
    println!("  {}  UTC{}", card.date_short, card.utc_offset);
    if let Some(diff) = &card.difference {
        if card.day_label.is_empty() || card.day_label == "Same day" {
            println!("  {}", diff);
        } else {
            println!("  {} ({})", diff, card.day_label);
        }
    }
    if let Some(w) = &card.weather {
        println!("  {:.0}°C  {} ({})", w.temperature_c, w.condition, w.description);
    }
}
