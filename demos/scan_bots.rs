//! Basic example: Discover all nearby SwitchBot Bots
//!
//! Run with: cargo run --example scan_bots

use std::time::Duration;
use switchbot_bot_ble::{BotConfig, BotManager, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("switchbot_bot_ble=debug".parse().unwrap()),
        )
        .init();

    println!("Scanning for SwitchBot Bots...\n");

    let config = BotConfig::new().with_scan_duration(Duration::from_secs(5));
    let manager = BotManager::with_config(config).await?;

    let bots = manager.discover().await?;

    if bots.is_empty() {
        println!("No Bots found.");
        println!();
        println!("Make sure:");
        println!("  - The Bot has battery left");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The Bot is within range");
        return Ok(());
    }

    println!("Found {} Bot(s):\n", bots.len());
    for bot in &bots {
        let mode = if bot.mode { "press" } else { "switch" };
        let state = if bot.state { "on" } else { "off" };
        let battery = bot
            .battery_percent
            .map(|b| format!("{}%", b))
            .unwrap_or_else(|| "N/A".to_string());
        let rssi = bot
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());

        println!("  {}", bot);
        println!("    Name: {}", bot.local_name.as_deref().unwrap_or("Unknown"));
        println!("    Mode: {} ({})", mode, state);
        println!("    Battery: {}", battery);
        println!("    RSSI: {}", rssi);
        println!();
    }

    Ok(())
}
