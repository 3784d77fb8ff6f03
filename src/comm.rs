// MIT License - Copyright (c) 2026 Peter Wright
// Typed controller commands

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::error::{RainbirdError, Result};
use crate::protocol::{program_id, Command, ControllerClock, ControllerStateReport, Reply};
use crate::status::{ControllerMetadata, StatusSnapshot};
use crate::transport::dispatcher::{Dispatcher, RetryPolicy};
use crate::transport::Transport;

/// Typed request layer over the dispatcher.
///
/// Each method sends one or two commands and checks that the controller
/// answered with the expected reply. A `NotAcknowledged` reply surfaces as
/// [`RainbirdError::NotAcknowledged`].
pub struct RainbirdComm {
    dispatcher: Dispatcher,
}

impl RainbirdComm {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, policy),
        }
    }

    /// Send an arbitrary command.
    pub async fn send(&self, command: &Command) -> Result<Reply> {
        self.dispatcher.send(command).await
    }

    async fn send_expecting_ack(&self, command: &Command) -> Result<()> {
        match self.send(command).await? {
            Reply::Acknowledged { .. } => Ok(()),
            other => Err(unexpected("Acknowledged", other)),
        }
    }

    /// Model number, model name and protocol version.
    pub async fn model_and_version(&self) -> Result<(u16, String, String)> {
        match self.send(&Command::ModelAndVersionGet).await? {
            Reply::ModelAndVersion {
                model_number,
                model_name,
                version,
            } => Ok((model_number, model_name, version)),
            other => Err(unexpected("ModelAndVersion", other)),
        }
    }

    pub async fn serial_number(&self) -> Result<String> {
        match self.send(&Command::SerialNumberGet).await? {
            Reply::SerialNumber { serial } => Ok(serial),
            other => Err(unexpected("SerialNumber", other)),
        }
    }

    pub async fn available_zones(&self) -> Result<BTreeSet<u8>> {
        match self.send(&Command::AvailableZonesGet { page: 0 }).await? {
            Reply::AvailableZones { zones, .. } => Ok(zones),
            other => Err(unexpected("AvailableZones", other)),
        }
    }

    /// Fetch everything that makes up [`ControllerMetadata`].
    pub async fn metadata(&self) -> Result<ControllerMetadata> {
        let (model_number, model_name, version) = self.model_and_version().await?;
        let serial_number = self.serial_number().await?;
        let zones = self.available_zones().await?;
        info!(
            "Controller {} (0x{:04X}) version {}, serial {}, zones {:?}",
            model_name, model_number, version, serial_number, zones
        );
        Ok(ControllerMetadata {
            model_number,
            model_name,
            version,
            serial_number,
            zones,
        })
    }

    /// Probe whether the firmware answers the per-zone state query.
    pub async fn supports_zone_state(&self) -> Result<bool> {
        match self.send(&Command::CurrentZoneStateGet { page: 0 }).await {
            Ok(Reply::CurrentZoneState(report)) => {
                debug!("Zone state query supported ({:?} layout)", report.layout);
                Ok(true)
            }
            Ok(other) => {
                debug!("Zone state query not supported: {}", other);
                Ok(false)
            }
            Err(RainbirdError::Decode(e)) => {
                warn!("Zone state reply not understood, using current zone query: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn irrigation_enabled(&self) -> Result<bool> {
        match self.send(&Command::IrrigationStateGet).await? {
            Reply::IrrigationState { enabled } => Ok(enabled),
            other => Err(unexpected("IrrigationState", other)),
        }
    }

    pub async fn rain_sensor(&self) -> Result<bool> {
        match self.send(&Command::RainSensorStateGet).await? {
            Reply::RainSensorState { set_point_reached } => Ok(set_point_reached),
            other => Err(unexpected("RainSensorState", other)),
        }
    }

    /// Read the controller date and time.
    pub async fn controller_clock(&self) -> Result<ControllerClock> {
        let (year, month, day) = match self.send(&Command::ControllerDateGet).await? {
            Reply::ControllerDate { year, month, day } => (year, month, day),
            other => return Err(unexpected("ControllerDate", other)),
        };
        let (hour, minute, second) = match self.send(&Command::ControllerTimeGet).await? {
            Reply::ControllerTime {
                hour,
                minute,
                second,
            } => (hour, minute, second),
            other => return Err(unexpected("ControllerTime", other)),
        };
        Ok(ControllerClock {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Write a date and time to the controller clock.
    pub async fn set_clock(&self, at: NaiveDateTime) -> Result<()> {
        self.send_expecting_ack(&Command::ControllerDateSet {
            year: at.year().clamp(0, 0x0FFF) as u16,
            month: at.month() as u8,
            day: at.day() as u8,
        })
        .await?;
        self.send_expecting_ack(&Command::ControllerTimeSet {
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            second: at.second() as u8,
        })
        .await
    }

    /// Rain delay in days.
    pub async fn rain_delay(&self) -> Result<u16> {
        match self.send(&Command::IrrigationDelayGet).await? {
            Reply::IrrigationDelay { days } => Ok(days),
            other => Err(unexpected("IrrigationDelay", other)),
        }
    }

    pub async fn set_rain_delay(&self, days: u16) -> Result<()> {
        self.send_expecting_ack(&Command::IrrigationDelaySet { days }).await
    }

    pub async fn controller_state(&self) -> Result<ControllerStateReport> {
        match self.send(&Command::ControllerStateGet).await? {
            Reply::ControllerState(state) => Ok(state),
            other => Err(unexpected("ControllerState", other)),
        }
    }

    pub async fn run_zone(&self, zone: u8, duration_secs: u32) -> Result<()> {
        self.send_expecting_ack(&Command::run_zone(zone, duration_secs)).await
    }

    pub async fn run_program(&self, program: u8) -> Result<()> {
        self.send_expecting_ack(&Command::RunProgram { program }).await
    }

    pub async fn stop_irrigation(&self) -> Result<()> {
        self.send_expecting_ack(&Command::StopIrrigation).await
    }

    pub async fn advance_zone(&self) -> Result<()> {
        self.send_expecting_ack(&Command::AdvanceZone).await
    }

    /// Read the rain sensor and the running zone.
    ///
    /// With `zone_state` the per-zone state query supplies remaining time
    /// and the current program. Without it the older current-zone query is
    /// used and both are left unknown.
    pub async fn snapshot(&self, zone_state: bool) -> Result<StatusSnapshot> {
        let rain_set_point_reached = self.rain_sensor().await?;

        if zone_state {
            match self.send(&Command::CurrentZoneStateGet { page: 0 }).await? {
                Reply::CurrentZoneState(report) => Ok(StatusSnapshot {
                    active_zone_id: if report.running { report.zone_id } else { 0 },
                    active_program_id: Some(program_id(report.program)),
                    time_remaining_secs: Some(report.time_remaining_secs as u32),
                    running: report.running,
                    rain_set_point_reached,
                }),
                other => Err(unexpected("CurrentZoneState", other)),
            }
        } else {
            match self.send(&Command::CurrentZoneGet { page: 0 }).await? {
                Reply::CurrentZone { zone_id, .. } => Ok(StatusSnapshot {
                    active_zone_id: zone_id,
                    active_program_id: None,
                    time_remaining_secs: None,
                    running: zone_id != 0,
                    rain_set_point_reached,
                }),
                other => Err(unexpected("CurrentZone", other)),
            }
        }
    }
}

fn unexpected(expected: &'static str, reply: Reply) -> RainbirdError {
    match reply {
        Reply::NotAcknowledged { command, code } => RainbirdError::NotAcknowledged { command, code },
        other => RainbirdError::UnexpectedReply {
            expected,
            got: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::protocol::{ZoneStateLayout, ZoneStateReport};

    /// Answers from a queue and records every command.
    #[derive(Default)]
    struct QueueTransport {
        replies: StdMutex<VecDeque<Result<Reply>>>,
        sent: StdMutex<Vec<Command>>,
    }

    impl QueueTransport {
        fn with(replies: Vec<Result<Reply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<Command> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for QueueTransport {
        async fn call(&self, command: &Command) -> Result<Reply> {
            self.sent.lock().unwrap().push(command.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RainbirdError::Rpc { code: 0, message: "script exhausted".into() }))
        }
    }

    fn comm(transport: Arc<QueueTransport>) -> RainbirdComm {
        RainbirdComm::new(transport, RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_metadata() {
        let transport = QueueTransport::with(vec![
            Ok(Reply::ModelAndVersion {
                model_number: 3,
                model_name: "ESP-RZXe".into(),
                version: "1.3".into(),
            }),
            Ok(Reply::SerialNumber { serial: "0000000012345678".into() }),
            Ok(Reply::AvailableZones { page: 0, zones: BTreeSet::from([1, 2, 3]) }),
        ]);
        let metadata = comm(transport.clone()).metadata().await.unwrap();
        assert_eq!(metadata.model_name, "ESP-RZXe");
        assert_eq!(metadata.serial_number, "0000000012345678");
        assert_eq!(metadata.zones, BTreeSet::from([1, 2, 3]));
        assert_eq!(
            transport.sent(),
            vec![
                Command::ModelAndVersionGet,
                Command::SerialNumberGet,
                Command::AvailableZonesGet { page: 0 }
            ]
        );
    }

    #[tokio::test]
    async fn test_not_acknowledged_surfaces_as_error() {
        let transport = QueueTransport::with(vec![Ok(Reply::NotAcknowledged { command: 0x42, code: 2 })]);
        let err = comm(transport).advance_zone().await.unwrap_err();
        assert!(matches!(err, RainbirdError::NotAcknowledged { command: 0x42, code: 2 }));
    }

    #[tokio::test]
    async fn test_wrong_reply_type() {
        let transport = QueueTransport::with(vec![Ok(Reply::IrrigationState { enabled: true })]);
        let err = comm(transport).serial_number().await.unwrap_err();
        assert!(matches!(err, RainbirdError::UnexpectedReply { expected: "SerialNumber", .. }));
    }

    #[tokio::test]
    async fn test_zone_state_probe() {
        let report = ZoneStateReport {
            page: 0,
            zone_id: 0,
            time_remaining_secs: 0,
            running: false,
            program: 255,
            layout: ZoneStateLayout::Extended,
        };
        let supported = QueueTransport::with(vec![Ok(Reply::CurrentZoneState(report))]);
        assert!(comm(supported).supports_zone_state().await.unwrap());

        let rejected = QueueTransport::with(vec![Ok(Reply::NotAcknowledged { command: 0x3B, code: 1 })]);
        assert!(!comm(rejected).supports_zone_state().await.unwrap());

        let garbled = QueueTransport::with(vec![Err(RainbirdError::Decode(
            crate::protocol::DecodeError::UnsupportedLayout { opcode: 0xBB, actual: 11 },
        ))]);
        assert!(!comm(garbled).supports_zone_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_with_zone_state() {
        let report = ZoneStateReport {
            page: 0,
            zone_id: 4,
            time_remaining_secs: 240,
            running: true,
            program: 1,
            layout: ZoneStateLayout::Extended,
        };
        let transport = QueueTransport::with(vec![
            Ok(Reply::RainSensorState { set_point_reached: false }),
            Ok(Reply::CurrentZoneState(report)),
        ]);
        let snapshot = comm(transport).snapshot(true).await.unwrap();
        assert_eq!(snapshot.active_zone_id, 4);
        assert_eq!(snapshot.active_program_id.as_deref(), Some("B"));
        assert_eq!(snapshot.time_remaining_secs, Some(240));
    }

    #[tokio::test]
    async fn test_snapshot_with_current_zone() {
        let transport = QueueTransport::with(vec![
            Ok(Reply::RainSensorState { set_point_reached: true }),
            Ok(Reply::CurrentZone { page: 0, zone_id: 2 }),
        ]);
        let snapshot = comm(transport.clone()).snapshot(false).await.unwrap();
        assert_eq!(snapshot.active_zone_id, 2);
        assert!(snapshot.running);
        assert!(snapshot.rain_set_point_reached);
        assert_eq!(snapshot.active_program_id, None);
        assert_eq!(snapshot.time_remaining_secs, None);
        assert_eq!(transport.sent()[1], Command::CurrentZoneGet { page: 0 });
    }

    #[tokio::test]
    async fn test_set_clock_frames() {
        let transport = QueueTransport::with(vec![
            Ok(Reply::Acknowledged { command: 0x13 }),
            Ok(Reply::Acknowledged { command: 0x11 }),
        ]);
        let at = NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|d| d.and_hms_opt(7, 30, 0))
            .unwrap();
        comm(transport.clone()).set_clock(at).await.unwrap();
        assert_eq!(
            transport.sent(),
            vec![
                Command::ControllerDateSet { year: 2024, month: 6, day: 15 },
                Command::ControllerTimeSet { hour: 7, minute: 30, second: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_controller_clock() {
        let transport = QueueTransport::with(vec![
            Ok(Reply::ControllerDate { year: 2024, month: 2, day: 29 }),
            Ok(Reply::ControllerTime { hour: 23, minute: 0, second: 5 }),
        ]);
        let clock = comm(transport).controller_clock().await.unwrap();
        assert_eq!(
            clock.to_naive(),
            NaiveDate::from_ymd_opt(2024, 2, 29).and_then(|d| d.and_hms_opt(23, 0, 5))
        );
    }
}
