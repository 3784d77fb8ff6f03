//! Example: Queue two zones back to back and watch them run in turn.
//!
//! Usage: cargo run --example run_zone -- <zone> <zone> [minutes]

use std::time::Duration;

use rainbird_lan_bridge::{ControllerConfig, ControllerEvent, RainbirdController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let first: u8 = args.first().map(|s| s.parse()).transpose()?.unwrap_or(1);
    let second: u8 = args.get(1).map(|s| s.parse()).transpose()?.unwrap_or(2);
    let minutes: u32 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(1);

    let config = ControllerConfig::builder()
        .host("192.168.0.100")
        .password("secret")
        .refresh_rate_secs(15)
        .build();

    let controller = RainbirdController::connect(config).await?;
    let mut events = controller.subscribe();

    // The second zone waits in the queue until the first one stops
    controller.activate_zone(first, minutes * 60).await?;
    controller.activate_zone(second, minutes * 60).await?;
    println!("Queued zones {first} and {second} for {minutes} minute(s) each");

    let mut seen = 0u8;
    let deadline = tokio::time::sleep(Duration::from_secs(u64::from(minutes) * 60 * 2 + 300));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Ok(event) = event else { break };
                if let ControllerEvent::StatusChanged(snapshot) = event
                    && snapshot.active_zone_id != seen
                {
                    seen = snapshot.active_zone_id;
                    println!("Running zone: {seen}");
                    if seen == 0 && !controller.is_active(None).await {
                        println!("All queued zones finished");
                        break;
                    }
                }
            }
            _ = &mut deadline => {
                println!("Timed out, stopping irrigation");
                controller.stop_irrigation().await?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping irrigation...");
                controller.deactivate_all_zones().await;
                break;
            }
        }
    }

    Ok(())
}
