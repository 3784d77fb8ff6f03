//! Example: Connect to a RainBird controller and print its state.

use rainbird_lan_bridge::{ControllerConfig, RainbirdController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ControllerConfig::builder()
        .host("192.168.0.100")
        .password("secret")
        .refresh_rate_secs(30)
        .build();

    println!("Connecting to controller...");
    let mut controller = RainbirdController::connect(config).await?;

    let meta = controller.metadata();
    println!("\n--- Controller ---");
    println!("  Model:   {} (0x{:04X})", meta.model_name, meta.model_number);
    println!("  Version: {}", meta.version);
    println!("  Serial:  {}", meta.serial_number);
    println!("  Zone state reporting: {}", controller.supports_zone_state());

    // Print zones
    let zones = controller.zones();
    println!("\n--- Zones ({}) ---", zones.len());
    for id in zones {
        if let Some(zone) = controller.zone_status(id).await {
            println!(
                "  Zone {:2}: state={:?} enabled={} remaining={}s",
                id,
                zone.state(),
                zone.enabled,
                controller.remaining_duration(Some(id)).await,
            );
        }
    }

    // Print settings
    let state = controller.controller_state().await?;
    println!("\n--- Settings ---");
    println!("  Rain delay:       {} days", state.delay_days);
    println!("  Rain set point:   {}", state.rain_set_point_reached);
    println!("  Irrigation on:    {}", state.irrigation_enabled);
    println!("  Seasonal adjust:  {}%", state.seasonal_adjust_percent);
    if let Some(snapshot) = controller.last_snapshot().await {
        println!("  Program:          {:?}", snapshot.active_program_id);
    }

    println!("\nPress Ctrl+C to disconnect...");
    tokio::signal::ctrl_c().await?;
    controller.shutdown();
    println!("Disconnected.");

    Ok(())
}
