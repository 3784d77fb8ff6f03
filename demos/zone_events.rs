//! Example: Subscribe to controller events and print zone changes.

use rainbird_lan_bridge::{ControllerConfig, ControllerEvent, RainbirdController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ControllerConfig::builder()
        .host("192.168.0.100")
        .password("secret")
        .refresh_rate_secs(10)
        .build();

    let mut controller = RainbirdController::connect(config).await?;
    let mut events = controller.subscribe();

    println!("Listening for controller events (Ctrl+C to stop)...\n");

    let mut running = 0u8;
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(ControllerEvent::StatusChanged(snapshot)) => {
                        if snapshot.active_zone_id != running {
                            if running != 0 {
                                println!("  - Zone {} stopped", running);
                            }
                            if snapshot.active_zone_id != 0 {
                                println!(
                                    "  + Zone {} running ({:?}s left, program {:?})",
                                    snapshot.active_zone_id,
                                    snapshot.time_remaining_secs,
                                    snapshot.active_program_id,
                                );
                            }
                            running = snapshot.active_zone_id;
                        }
                    }
                    Ok(event) => {
                        println!("Event: {:?}", event);
                    }
                    Err(e) => {
                        println!("Event channel error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}
