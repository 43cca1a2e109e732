//! Example: Read the status of one Bot
//!
//! Run with: cargo run --example bot_status -- AA:BB:CC:DD:EE:FF

use switchbot_bot_ble::{BDAddr, BotManager, Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("switchbot_bot_ble=info".parse().unwrap()),
        )
        .init();

    let Some(arg) = std::env::args().nth(1) else {
        eprintln!("Usage: bot_status <address>");
        return Ok(());
    };
    let address: BDAddr = arg.parse().map_err(|_| Error::InvalidParameter {
        name: "address".to_string(),
        value: arg.clone(),
    })?;

    let manager = BotManager::new().await?;

    println!("Querying Bot {}...\n", address);

    match manager.query_status(address).await {
        Ok(status) => {
            println!("Battery: {}%", status.battery_percent);
            println!("Firmware: {:.1}", status.firmware_version);
            println!("Strength: {}", status.push_strength);
            println!("ADC: {}", status.adc_value);
            println!("Motor Calibration: {}", status.motor_calibration);
            println!("Timer: {}", status.timer_count);
            println!("Act Mode: {}", status.act_mode);
            println!("Hold-and-press Times: {}", status.hold_press_count);
        }
        Err(e) => {
            let step = e
                .step()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("Status query failed during {}: {}", step, e);
        }
    }

    Ok(())
}
