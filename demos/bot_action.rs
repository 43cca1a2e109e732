//! Example: Press or switch a Bot
//!
//! Run with: cargo run --example bot_action -- AA:BB:CC:DD:EE:FF [press|on|off]

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

    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        eprintln!("Usage: bot_action <address> [press|on|off]");
        return Ok(());
    };
    let address: BDAddr = arg.parse().map_err(|_| Error::InvalidParameter {
        name: "address".to_string(),
        value: arg.clone(),
    })?;
    let action = args.next().unwrap_or_else(|| "press".to_string());

    let manager = BotManager::new().await?;

    match action.as_str() {
        "press" => manager.press(address).await?,
        "on" => manager.turn_on(address).await?,
        "off" => manager.turn_off(address).await?,
        other => {
            return Err(Error::InvalidParameter {
                name: "action".to_string(),
                value: other.to_string(),
            })
        }
    }

    println!("Sent {} to {}", action, address);
    Ok(())
}
