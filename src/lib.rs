// MIT License - Copyright (c) 2026 Peter Wright
// rainbird-lan-bridge
//
//! # rainbird-lan-bridge
//!
//! Local network client for RainBird irrigation controllers (ESP-Me,
//! ESP-RZXe, ST8x-WiFi and friends) fitted with a LNK WiFi module.
//!
//! Commands travel as binary SIP frames inside an encrypted JSON-RPC
//! request posted to `http://{host}/stick`. On top of that the library
//! keeps a zone view, polls the controller and queues zone starts so that
//! only one zone runs at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rainbird_lan_bridge::{ControllerConfig, RainbirdController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ControllerConfig::builder()
//!         .host("192.168.0.100")
//!         .password("secret")
//!         .build();
//!
//!     let controller = RainbirdController::connect(config).await?;
//!
//!     let mut events = controller.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     controller.activate_zone(1, 600).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

pub mod comm;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod event;
pub mod protocol;
pub mod status;
pub mod transport;

// Re-exports for convenience
pub use config::{ControllerConfig, ControllerConfigBuilder};
pub use controller::RainbirdController;
pub use error::{RainbirdError, Result};
pub use event::{ControllerEvent, EventReceiver};
pub use protocol::{Command, Reply};
pub use status::{ControllerMetadata, StatusSnapshot, ZoneState, ZoneStatus};
pub use transport::Transport;
pub use transport::dispatcher::RetryPolicy;
pub use transport::http::HttpTransport;
