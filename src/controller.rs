// MIT License - Copyright (c) 2026 Peter Wright
// Zone coordination, status polling and the public controller API

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::{mpsc, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::comm::RainbirdComm;
use crate::config::ControllerConfig;
use crate::error::{RainbirdError, Result};
use crate::event::{event_channel, ControllerEvent, EventReceiver, EventSender};
use crate::protocol::{program_number, ControllerStateReport};
use crate::status::{ControllerMetadata, StatusSnapshot, ZoneBook, ZoneStatus};
use crate::transport::http::HttpTransport;
use crate::transport::Transport;

/// A queued request to start a zone.
#[derive(Debug, Clone, Copy)]
struct StartJob {
    zone: u8,
    duration_secs: u32,
}

/// State shared between the public handle and the background tasks.
struct Shared {
    comm: RainbirdComm,
    config: ControllerConfig,
    metadata: ControllerMetadata,
    /// Per-zone state query answered at startup
    zone_state_supported: bool,
    /// Cleared for the rest of the session by the first rejected AdvanceZone
    advance_supported: AtomicBool,
    book: RwLock<ZoneBook>,
    event_tx: EventSender,
    /// Running zone id after the latest poll, 0 when idle
    running_zone_tx: watch::Sender<u8>,
    refresh_lock: Mutex<()>,
    /// Cancels and rearms the pending poll timer
    poll_reset: Notify,
    refresh_requested: Notify,
}

impl Shared {
    async fn refresh_status(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.poll_reset.notify_one();
        let result = self.perform_status_refresh().await;
        self.poll_reset.notify_one();
        result
    }

    async fn perform_status_refresh(&self) -> Result<()> {
        let snapshot = match self.comm.snapshot(self.zone_state_supported).await {
            Ok(snapshot) => snapshot,
            Err(RainbirdError::Decode(e)) => {
                warn!("Ignoring undecodable status reply: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        debug!("Status: {:?}", snapshot);

        let events = {
            let mut book = self.book.write().await;
            let events = book.reconcile(&snapshot, Instant::now());
            self.running_zone_tx.send_replace(book.running_zone().unwrap_or(0));
            events
        };

        for event in events {
            let _ = self.event_tx.send(event);
        }
        Ok(())
    }

    fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }

    /// Poll interval, shortened to the running zone's remaining time.
    async fn next_poll_delay(&self) -> Duration {
        let rate = self.config.refresh_rate();
        let remaining = self.book.read().await.remaining_duration(None, Instant::now());
        if remaining > 0 {
            rate.min(Duration::from_secs(remaining as u64))
        } else {
            rate
        }
    }

    async fn start_zone(&self, job: StartJob) -> Result<()> {
        let zone = job.zone;
        loop {
            let (active, enabled, other_running) = {
                let book = self.book.read().await;
                let status = book.zone(zone).ok_or(RainbirdError::InvalidZone { zone })?;
                (
                    status.active,
                    status.enabled,
                    book.running_zone().filter(|&running| running != zone),
                )
            };

            if !active || !enabled {
                info!("Zone {} no longer requested, skipping start", zone);
                return Ok(());
            }

            match other_running {
                None => break,
                Some(other) => {
                    info!("Zone {} waiting for zone {} to finish", zone, other);
                    let mut running_rx = self.running_zone_tx.subscribe();
                    running_rx
                        .wait_for(|id| *id == 0)
                        .await
                        .map_err(|_| RainbirdError::ChannelClosed)?;
                }
            }
        }

        info!("Starting zone {} for {}s", zone, job.duration_secs);
        self.comm.run_zone(zone, job.duration_secs).await?;

        // From here on deactivate_zone sees the zone in use and stops it
        let still_requested = {
            let mut book = self.book.write().await;
            book.note_run_started(zone, job.duration_secs, !self.zone_state_supported, Instant::now())?;
            self.running_zone_tx.send_replace(zone);
            book.zone(zone).is_some_and(|z| z.active && z.enabled)
        };

        if !still_requested {
            info!("Zone {} was deactivated while starting, stopping it", zone);
            self.stop_running_zone().await;
        }

        // Later jobs must see the controller's view of this zone
        self.refresh_status().await
    }

    /// Stop the running zone, preferring AdvanceZone so a queued sequence
    /// carries on.
    async fn stop_running_zone(&self) {
        if self.advance_supported.load(Ordering::SeqCst) {
            match self.comm.advance_zone().await {
                Ok(()) => return,
                Err(RainbirdError::NotAcknowledged { code, .. }) => {
                    warn!(
                        "AdvanceZone not supported (code {}), using StopIrrigation from now on",
                        code
                    );
                    self.advance_supported.store(false, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Failed to advance zone: {}", e);
                    return;
                }
            }
        }

        if let Err(e) = self.comm.stop_irrigation().await {
            warn!("Failed to stop irrigation: {}", e);
        }
    }
}

async fn run_poll_loop(shared: Arc<Shared>) {
    loop {
        let delay = shared.next_poll_delay().await;
        debug!("Next status poll in {:?}", delay);
        tokio::select! {
            _ = sleep(delay) => {
                if let Err(e) = shared.refresh_status().await {
                    warn!("Status refresh failed: {}", e);
                }
            }
            _ = shared.poll_reset.notified() => {}
        }
    }
}

async fn run_refresh_debounce(shared: Arc<Shared>) {
    let quiet = shared.config.refresh_debounce();
    loop {
        shared.refresh_requested.notified().await;
        loop {
            tokio::select! {
                _ = sleep(quiet) => break,
                _ = shared.refresh_requested.notified() => {}
            }
        }
        if let Err(e) = shared.refresh_status().await {
            warn!("Status refresh failed: {}", e);
        }
    }
}

async fn run_start_jobs(shared: Arc<Shared>, mut jobs: mpsc::UnboundedReceiver<StartJob>) {
    let job_timeout = shared.config.job_timeout();
    while let Some(job) = jobs.recv().await {
        match timeout(job_timeout, shared.start_zone(job)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to start zone {}: {}", job.zone, e),
            Err(_) => warn!("Start of zone {} timed out after {:?}", job.zone, job_timeout),
        }
        shared.request_refresh();
    }
}

/// The main public API for a RainBird controller.
///
/// Holds the zone view, polls the controller in the background and runs
/// zone starts one at a time, since the hardware only runs a single zone.
///
/// # Example
///
/// ```no_run
/// use rainbird_lan_bridge::{ControllerConfig, RainbirdController};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ControllerConfig::builder()
///         .host("192.168.0.100")
///         .password("secret")
///         .build();
///
///     let controller = RainbirdController::connect(config).await?;
///
///     let mut events = controller.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     // Run zone 3 for five minutes
///     controller.activate_zone(3, 300).await?;
///
///     tokio::signal::ctrl_c().await?;
///     Ok(())
/// }
/// ```
pub struct RainbirdController {
    shared: Arc<Shared>,
    job_tx: mpsc::UnboundedSender<StartJob>,
    poll_handle: Option<JoinHandle<()>>,
    debounce_handle: Option<JoinHandle<()>>,
    job_handle: Option<JoinHandle<()>>,
}

impl RainbirdController {
    /// Connect to the controller over HTTP and initialize.
    pub async fn connect(config: ControllerConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.host, &config.password)?);
        Self::with_transport(config, transport).await
    }

    /// Initialize against any transport.
    ///
    /// Fetches metadata, probes the zone state query, checks irrigation and
    /// the controller clock, refreshes status once and starts the
    /// background tasks.
    pub async fn with_transport(config: ControllerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        info!("Connecting to controller at {}", config.host);
        let comm = RainbirdComm::new(transport, config.retry_policy());

        let metadata = comm.metadata().await?;
        let zone_state_supported = comm.supports_zone_state().await?;
        debug!("Zone state query supported: {}", zone_state_supported);

        match comm.irrigation_enabled().await {
            Ok(true) => {}
            Ok(false) => warn!("Irrigation is disabled on the controller"),
            Err(e) => warn!("Failed to read irrigation state: {}", e),
        }

        check_clock_drift(&comm, config.max_clock_drift()).await;

        let (event_tx, _event_rx) = event_channel(config.event_capacity);
        let (running_zone_tx, _) = watch::channel(0u8);
        let book = ZoneBook::new(&metadata.zones);

        let shared = Arc::new(Shared {
            comm,
            config,
            metadata,
            zone_state_supported,
            advance_supported: AtomicBool::new(true),
            book: RwLock::new(book),
            event_tx,
            running_zone_tx,
            refresh_lock: Mutex::new(()),
            poll_reset: Notify::new(),
            refresh_requested: Notify::new(),
        });

        shared.refresh_status().await?;

        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let controller = Self {
            poll_handle: Some(tokio::spawn(run_poll_loop(shared.clone()))),
            debounce_handle: Some(tokio::spawn(run_refresh_debounce(shared.clone()))),
            job_handle: Some(tokio::spawn(run_start_jobs(shared.clone(), job_rx))),
            shared,
            job_tx,
        };

        let _ = controller.shared.event_tx.send(ControllerEvent::Initialized);
        info!("Controller initialization completed");

        Ok(controller)
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.event_tx.subscribe()
    }

    // --- Metadata ---

    pub fn metadata(&self) -> &ControllerMetadata {
        &self.shared.metadata
    }

    pub fn model_name(&self) -> &str {
        &self.shared.metadata.model_name
    }

    pub fn version(&self) -> &str {
        &self.shared.metadata.version
    }

    pub fn serial_number(&self) -> &str {
        &self.shared.metadata.serial_number
    }

    /// Installed zone numbers, ascending.
    pub fn zones(&self) -> Vec<u8> {
        self.shared.metadata.zones.iter().copied().collect()
    }

    /// Whether the firmware reports per-zone state with remaining time.
    pub fn supports_zone_state(&self) -> bool {
        self.shared.zone_state_supported
    }

    /// Whether AdvanceZone is still used to stop a single zone.
    pub fn supports_advance_zone(&self) -> bool {
        self.shared.advance_supported.load(Ordering::SeqCst)
    }

    // --- Queries ---

    pub async fn zone_status(&self, zone: u8) -> Option<ZoneStatus> {
        self.shared.book.read().await.zone(zone).cloned()
    }

    /// With a zone, whether it has been requested through
    /// [`activate_zone`](Self::activate_zone) and not yet cancelled or
    /// finished; otherwise whether any zone is. A zone run by a program is
    /// not active; see [`is_in_use`](Self::is_in_use).
    pub async fn is_active(&self, zone: Option<u8>) -> bool {
        self.shared.book.read().await.is_active(zone)
    }

    /// With a zone, whether the controller reports it running; otherwise
    /// whether any zone is running.
    pub async fn is_in_use(&self, zone: Option<u8>) -> bool {
        self.shared.book.read().await.is_in_use(zone)
    }

    /// Seconds left for a zone, or for the running zone.
    pub async fn remaining_duration(&self, zone: Option<u8>) -> u32 {
        self.shared.book.read().await.remaining_duration(zone, Instant::now())
    }

    pub async fn is_enabled(&self, zone: u8) -> bool {
        self.shared.book.read().await.zone(zone).is_some_and(|z| z.enabled)
    }

    /// `None` when the controller cannot report the current program.
    pub async fn is_program_running(&self, id: &str) -> Option<bool> {
        let book = self.shared.book.read().await;
        book.current_program()
            .map(|current| !current.is_empty() && current.eq_ignore_ascii_case(id))
    }

    pub async fn rain_set_point_reached(&self) -> Option<bool> {
        self.shared.book.read().await.rain_set_point_reached()
    }

    pub async fn last_snapshot(&self) -> Option<StatusSnapshot> {
        self.shared.book.read().await.last_snapshot().cloned()
    }

    // --- Commands ---

    /// Request a zone run. The start is queued behind earlier requests and
    /// waits for any other running zone to finish.
    pub async fn activate_zone(&self, zone: u8, duration_secs: u32) -> Result<()> {
        {
            let mut book = self.shared.book.write().await;
            let status = book.zone(zone).ok_or(RainbirdError::InvalidZone { zone })?;
            if !status.enabled {
                return Err(RainbirdError::ZoneDisabled { zone });
            }
            book.set_active(zone, true)?;
        }
        info!("Zone {} requested for {}s", zone, duration_secs);
        self.job_tx
            .send(StartJob { zone, duration_secs })
            .map_err(|_| RainbirdError::ChannelClosed)
    }

    /// Cancel a zone request and stop the zone if it is running.
    pub async fn deactivate_zone(&self, zone: u8) -> Result<()> {
        let in_use = {
            let mut book = self.shared.book.write().await;
            book.set_active(zone, false)?;
            book.is_in_use(Some(zone))
        };
        info!("Zone {} deactivated", zone);
        if in_use {
            self.shared.stop_running_zone().await;
        }
        self.shared.request_refresh();
        Ok(())
    }

    /// Cancel every zone request and stop irrigation if a zone is running.
    pub async fn deactivate_all_zones(&self) {
        let in_use = {
            let mut book = self.shared.book.write().await;
            book.deactivate_all();
            book.is_in_use(None)
        };
        info!("All zones deactivated");
        if in_use && let Err(e) = self.shared.comm.stop_irrigation().await {
            warn!("Failed to stop irrigation: {}", e);
        }
        self.shared.request_refresh();
    }

    /// Enable or disable a zone. Disabling an active zone deactivates it.
    pub async fn enable_zone(&self, zone: u8, enabled: bool) -> Result<()> {
        let (changed, active) = {
            let mut book = self.shared.book.write().await;
            let changed = book.set_enabled(zone, enabled)?;
            (changed, book.is_active(Some(zone)))
        };
        if changed {
            info!("Zone {} {}", zone, if enabled { "enabled" } else { "disabled" });
            let _ = self
                .shared
                .event_tx
                .send(ControllerEvent::ZoneEnableChanged { zone, enabled });
        }
        if !enabled && active {
            self.deactivate_zone(zone).await?;
        }
        Ok(())
    }

    /// Start a stored program by letter (`"A"`..`"Z"`).
    pub async fn start_program(&self, id: &str) -> Result<()> {
        let program = program_number(id).ok_or_else(|| RainbirdError::InvalidProgram { id: id.to_string() })?;
        info!("Starting program {}", id.to_ascii_uppercase());
        self.shared.comm.run_program(program).await?;
        self.shared.refresh_status().await
    }

    /// Stop all irrigation and cancel every zone request.
    pub async fn stop_irrigation(&self) -> Result<()> {
        self.shared.book.write().await.deactivate_all();
        info!("Stopping irrigation");
        self.shared.comm.stop_irrigation().await?;
        self.shared.refresh_status().await
    }

    /// Poll the controller now.
    pub async fn refresh_status(&self) -> Result<()> {
        self.shared.refresh_status().await
    }

    /// Ask for a refresh soon. Bursts of requests collapse into one poll.
    pub fn request_refresh(&self) {
        self.shared.request_refresh();
    }

    // --- Controller settings ---

    /// Rain delay in days.
    pub async fn rain_delay(&self) -> Result<u16> {
        self.shared.comm.rain_delay().await
    }

    pub async fn set_rain_delay(&self, days: u16) -> Result<()> {
        info!("Setting rain delay to {} days", days);
        self.shared.comm.set_rain_delay(days).await
    }

    /// Set the controller clock to local time.
    pub async fn sync_clock(&self) -> Result<()> {
        let now = chrono::Local::now().naive_local();
        info!("Setting controller clock to {}", now.format("%Y-%m-%d %H:%M:%S"));
        self.shared.comm.set_clock(now).await
    }

    pub async fn controller_state(&self) -> Result<ControllerStateReport> {
        self.shared.comm.controller_state().await
    }

    /// Stop the background tasks.
    pub fn shutdown(&mut self) {
        for handle in [
            self.poll_handle.take(),
            self.debounce_handle.take(),
            self.job_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

impl Drop for RainbirdController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn check_clock_drift(comm: &RainbirdComm, max_drift: Duration) {
    let clock = match comm.controller_clock().await {
        Ok(clock) => clock,
        Err(e) => {
            warn!("Failed to read controller clock: {}", e);
            return;
        }
    };

    let Some(controller_time) = clock.to_naive() else {
        warn!("Controller reported an invalid date: {:?}", clock);
        return;
    };

    let local = chrono::Local::now().naive_local();
    let drift = clock_drift(controller_time, local);
    if drift > max_drift {
        warn!(
            "Controller clock is off by {}s (controller {}, local {})",
            drift.as_secs(),
            controller_time.format("%Y-%m-%d %H:%M:%S"),
            local.format("%Y-%m-%d %H:%M:%S")
        );
    } else {
        debug!("Controller clock drift {}s", drift.as_secs());
    }
}

/// Absolute difference between the controller clock and local time.
fn clock_drift(controller_time: NaiveDateTime, local: NaiveDateTime) -> Duration {
    Duration::from_secs((local - controller_time).num_seconds().unsigned_abs())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_clock_drift_is_symmetric() {
        assert_eq!(clock_drift(at(6, 0, 0), at(6, 4, 30)), Duration::from_secs(270));
        assert_eq!(clock_drift(at(6, 4, 30), at(6, 0, 0)), Duration::from_secs(270));
        assert_eq!(clock_drift(at(6, 0, 0), at(6, 0, 0)), Duration::ZERO);
    }

    #[test]
    fn test_clock_drift_beyond_default_tolerance() {
        let tolerance = ControllerConfig::default().max_clock_drift();
        assert!(clock_drift(at(6, 0, 0), at(6, 5, 0)) <= tolerance);
        assert!(clock_drift(at(6, 0, 0), at(6, 5, 1)) > tolerance);
    }
}
