// MIT License - Copyright (c) 2026 Peter Wright
// Zone, program and rain sensor state

use std::collections::{BTreeMap, BTreeSet};

use tokio::time::Instant;
use tracing::debug;

use crate::error::{RainbirdError, Result};
use crate::event::ControllerEvent;

/// Static controller details, fetched once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerMetadata {
    pub model_number: u16,
    pub model_name: String,
    pub version: String,
    pub serial_number: String,
    /// Installed zones, ascending
    pub zones: BTreeSet<u8>,
}

/// Per-zone state.
///
/// `active` is the caller's intent. `running`, `remaining_duration_secs`
/// and `activation_timestamp` come from status polls, or from the local
/// estimate made when a run command is accepted on hardware that cannot
/// report remaining time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub active: bool,
    pub running: bool,
    pub remaining_duration_secs: u32,
    pub activation_timestamp: Option<Instant>,
    pub enabled: bool,
    /// A run command was accepted since the last poll, so a longer
    /// remaining time is expected
    restarted: bool,
}

impl Default for ZoneStatus {
    fn default() -> Self {
        Self {
            active: false,
            running: false,
            remaining_duration_secs: 0,
            activation_timestamp: None,
            enabled: true,
            restarted: false,
        }
    }
}

/// Lifecycle of a zone as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Idle,
    /// Activation requested, not yet reported running
    Requested,
    Running,
}

impl ZoneStatus {
    pub fn state(&self) -> ZoneState {
        if self.running {
            ZoneState::Running
        } else if self.active {
            ZoneState::Requested
        } else {
            ZoneState::Idle
        }
    }

    /// Remaining run time at `now`, counting down from the last report.
    pub fn remaining_at(&self, now: Instant) -> u32 {
        match self.activation_timestamp {
            Some(started) => {
                let elapsed = now.saturating_duration_since(started).as_secs();
                let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
                self.remaining_duration_secs.saturating_sub(elapsed)
            }
            None => self.remaining_duration_secs,
        }
    }

    fn clear(&mut self) {
        self.running = false;
        self.remaining_duration_secs = 0;
        self.activation_timestamp = None;
        self.restarted = false;
    }
}

/// Values read by a single status poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Running zone, 0 when idle
    pub active_zone_id: u8,
    /// Current program letter, `""` for none, `None` when the controller
    /// cannot report it
    pub active_program_id: Option<String>,
    /// `None` when the controller cannot report remaining time
    pub time_remaining_secs: Option<u32>,
    pub running: bool,
    pub rain_set_point_reached: bool,
}

/// The coordinator's view of every zone plus the current program and the
/// rain sensor.
#[derive(Debug, Clone)]
pub struct ZoneBook {
    zones: BTreeMap<u8, ZoneStatus>,
    current_program: Option<String>,
    rain_set_point_reached: Option<bool>,
    last_snapshot: Option<StatusSnapshot>,
}

impl ZoneBook {
    pub fn new(zones: &BTreeSet<u8>) -> Self {
        Self {
            zones: zones.iter().map(|&id| (id, ZoneStatus::default())).collect(),
            current_program: None,
            rain_set_point_reached: None,
            last_snapshot: None,
        }
    }

    pub fn zone(&self, zone: u8) -> Option<&ZoneStatus> {
        self.zones.get(&zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = (u8, &ZoneStatus)> {
        self.zones.iter().map(|(&id, status)| (id, status))
    }

    fn zone_mut(&mut self, zone: u8) -> Result<&mut ZoneStatus> {
        self.zones.get_mut(&zone).ok_or(RainbirdError::InvalidZone { zone })
    }

    /// Zone currently reported running.
    pub fn running_zone(&self) -> Option<u8> {
        self.zones.iter().find(|(_, z)| z.running).map(|(&id, _)| id)
    }

    pub fn current_program(&self) -> Option<&str> {
        self.current_program.as_deref()
    }

    pub fn rain_set_point_reached(&self) -> Option<bool> {
        self.rain_set_point_reached
    }

    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn set_active(&mut self, zone: u8, active: bool) -> Result<()> {
        self.zone_mut(zone)?.active = active;
        Ok(())
    }

    pub fn deactivate_all(&mut self) {
        for status in self.zones.values_mut() {
            status.active = false;
        }
    }

    /// Returns true if the flag changed.
    pub fn set_enabled(&mut self, zone: u8, enabled: bool) -> Result<bool> {
        let status = self.zone_mut(zone)?;
        let changed = status.enabled != enabled;
        status.enabled = enabled;
        Ok(changed)
    }

    /// Record an accepted run command.
    ///
    /// The zone counts as running straight away, replacing any other running
    /// zone, until the next poll says otherwise. Without remaining-time
    /// telemetry the requested duration becomes the local estimate.
    pub fn note_run_started(&mut self, zone: u8, duration_secs: u32, estimate: bool, now: Instant) -> Result<()> {
        self.zone_mut(zone)?;
        for (&id, status) in self.zones.iter_mut() {
            if id != zone && status.running {
                status.clear();
            }
        }

        let status = self.zone_mut(zone)?;
        status.running = true;
        status.restarted = true;
        if estimate {
            status.remaining_duration_secs = duration_secs;
            status.activation_timestamp = Some(now);
        }
        Ok(())
    }

    /// With `zone`, whether that zone is active; otherwise whether any is.
    pub fn is_active(&self, zone: Option<u8>) -> bool {
        match zone {
            Some(id) => self.zones.get(&id).is_some_and(|z| z.active),
            None => self.zones.values().any(|z| z.active),
        }
    }

    /// With `zone`, whether that zone is running; otherwise whether any is.
    pub fn is_in_use(&self, zone: Option<u8>) -> bool {
        match zone {
            Some(id) => self.zones.get(&id).is_some_and(|z| z.running),
            None => self.running_zone().is_some(),
        }
    }

    /// Remaining seconds for `zone`, or for the running zone. Floors at 0.
    pub fn remaining_duration(&self, zone: Option<u8>, now: Instant) -> u32 {
        let id = match zone.or_else(|| self.running_zone()) {
            Some(id) => id,
            None => return 0,
        };
        match self.zones.get(&id) {
            Some(status) if status.running || status.active => status.remaining_at(now),
            _ => 0,
        }
    }

    /// Apply a poll result and return the events it produces.
    ///
    /// The zone matching the snapshot's id is marked running; every other
    /// zone is cleared, and the zone that was running before loses its
    /// `active` flag. `StatusChanged` is always the last event.
    pub fn reconcile(&mut self, snapshot: &StatusSnapshot, now: Instant) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        let previous_running = self.running_zone();

        for (&id, status) in self.zones.iter_mut() {
            if snapshot.active_zone_id != 0 && id == snapshot.active_zone_id {
                let was_running = status.running;
                status.running = true;
                match snapshot.time_remaining_secs {
                    Some(reported) => {
                        // Remaining time never goes up while the same run continues
                        let reported = if was_running && !status.restarted {
                            reported.min(status.remaining_at(now))
                        } else {
                            reported
                        };
                        status.remaining_duration_secs = reported;
                        status.activation_timestamp = Some(now);
                    }
                    None => {
                        if status.activation_timestamp.is_none() {
                            status.activation_timestamp = Some(now);
                        }
                    }
                }
                status.restarted = false;
            } else {
                if previous_running == Some(id) {
                    debug!("Zone {} finished", id);
                    status.active = false;
                }
                status.clear();
            }
        }

        if self.rain_set_point_reached != Some(snapshot.rain_set_point_reached) {
            debug!("Rain sensor set point reached: {}", snapshot.rain_set_point_reached);
            self.rain_set_point_reached = Some(snapshot.rain_set_point_reached);
            events.push(ControllerEvent::RainSensorChanged {
                set_point_reached: snapshot.rain_set_point_reached,
            });
        }

        let previous_program = self.current_program.take().unwrap_or_default();
        let current_program = snapshot.active_program_id.clone().unwrap_or_default();
        if previous_program != current_program {
            if !previous_program.is_empty() {
                events.push(ControllerEvent::ProgramCompleted {
                    program: previous_program,
                });
            }
            if !current_program.is_empty() {
                events.push(ControllerEvent::ProgramStarted {
                    program: current_program,
                });
            }
        }
        self.current_program = snapshot.active_program_id.clone();

        self.last_snapshot = Some(snapshot.clone());
        events.push(ControllerEvent::StatusChanged(snapshot.clone()));
        events
    }
}
