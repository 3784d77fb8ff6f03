// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use rainbird_lan_bridge::{ControllerConfig, ControllerEvent, RainbirdController};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "rainbird2mqtt")]
#[command(about = "Bridge between a RainBird irrigation controller and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    controller: ControllerToml,
    mqtt: MqttToml,
    #[serde(default, deserialize_with = "deserialize_zone_names")]
    zone_names: HashMap<u8, String>,
}

fn deserialize_zone_names<'de, D>(deserializer: D) -> Result<HashMap<u8, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u8>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid zone ID: {k}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ControllerToml {
    host: String,
    password: String,
    #[serde(default = "default_refresh_rate")]
    refresh_rate_secs: u64,
    #[serde(default = "default_retry_delay")]
    retry_delay_ms: u64,
    #[serde(default = "default_refresh_debounce")]
    refresh_debounce_ms: u64,
    #[serde(default = "default_job_timeout")]
    job_timeout_secs: u64,
    #[serde(default = "default_max_clock_drift")]
    max_clock_drift_secs: u64,
    /// Run time used when ACTIVATE_ZONE carries no duration
    #[serde(default = "default_zone_duration")]
    default_duration_secs: u32,
    /// Set the controller clock to local time on startup
    #[serde(default)]
    sync_clock: bool,
}

// Unset controller fields take the library defaults
fn default_refresh_rate() -> u64 {
    ControllerConfig::default().refresh_rate_secs
}
fn default_retry_delay() -> u64 {
    ControllerConfig::default().retry_delay_ms
}
fn default_refresh_debounce() -> u64 {
    ControllerConfig::default().refresh_debounce_ms
}
fn default_job_timeout() -> u64 {
    ControllerConfig::default().job_timeout_secs
}
fn default_max_clock_drift() -> u64 {
    ControllerConfig::default().max_clock_drift_secs
}
fn default_zone_duration() -> u32 {
    600
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
    #[serde(default = "default_snapshot_interval")]
    snapshot_interval_secs: u64,
}

fn default_client_id() -> String {
    "rainbird-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "rainbird/cmd".to_string()
}
fn default_publish_topic() -> String {
    "rainbird".to_string()
}
fn default_snapshot_interval() -> u64 {
    60
}

fn build_controller_config(toml: &ControllerToml) -> ControllerConfig {
    ControllerConfig::builder()
        .host(&toml.host)
        .password(&toml.password)
        .refresh_rate_secs(toml.refresh_rate_secs)
        .retry_delay_ms(toml.retry_delay_ms)
        .refresh_debounce_ms(toml.refresh_debounce_ms)
        .job_timeout_secs(toml.job_timeout_secs)
        .max_clock_drift_secs(toml.max_clock_drift_secs)
        .build()
}

/// Settings that apply to one bridge session.
struct Session {
    controller_config: ControllerConfig,
    default_duration_secs: u32,
    sync_clock: bool,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_client_id: String,
    publish_topic: String,
    subscribe_topic: String,
    snapshot_interval_secs: u64,
    zone_names: Arc<HashMap<u8, String>>,
}

fn load_session(path: &str) -> Result<Session> {
    let config_text = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;

    Ok(Session {
        controller_config: build_controller_config(&config.controller),
        default_duration_secs: config.controller.default_duration_secs,
        sync_clock: config.controller.sync_clock,
        mqtt_host,
        mqtt_port,
        mqtt_client_id: config.mqtt.client_id,
        publish_topic: config.mqtt.publish_topic,
        subscribe_topic: config.mqtt.subscribe_topic,
        snapshot_interval_secs: config.mqtt.snapshot_interval_secs.max(1),
        zone_names: Arc::new(config.zone_names),
    })
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Published messages share a flat {now, op, ...} structure

#[derive(Serialize)]
struct MqttSnapshot {
    now: u64,
    op: String,
    state: MqttSnapshotState,
}

#[derive(Serialize)]
struct MqttSnapshotState {
    model: String,
    version: String,
    serial: String,
    #[serde(rename = "rainSetPointReached")]
    rain_set_point_reached: bool,
    /// Current program letter, null when the controller cannot tell
    program: Option<String>,
    zones: Vec<MqttZoneState>,
}

#[derive(Serialize)]
struct MqttZoneState {
    id: u8,
    name: String,
    active: bool,
    running: bool,
    enabled: bool,
    remaining: u32,
}

// Zone events: {now, op, zone}
#[derive(Serialize)]
struct MqttZoneEvent {
    now: u64,
    op: String,
    zone: u8,
}

// Program events: {now, op, program}
#[derive(Serialize)]
struct MqttProgramEvent {
    now: u64,
    op: String,
    program: String,
}

// Rain sensor: {now, op, setPointReached}
#[derive(Serialize)]
struct MqttRainSensorEvent {
    now: u64,
    op: String,
    #[serde(rename = "setPointReached")]
    set_point_reached: bool,
}

// CMD_ACK response
#[derive(Serialize)]
struct MqttCmdAck {
    now: u64,
    op: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

// Inbound command (subscribed)
#[derive(Deserialize)]
struct MqttCommand {
    op: String,
    #[serde(default)]
    #[allow(dead_code)]
    op_id: Option<String>,
    #[serde(default)]
    zone: Option<u8>,
    /// Seconds
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    program: Option<String>,
    #[serde(default)]
    days: Option<u16>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn zone_label(zone_id: u8, overrides: &HashMap<u8, String>) -> String {
    overrides
        .get(&zone_id)
        .cloned()
        .unwrap_or_else(|| format!("Zone {zone_id}"))
}

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_zone_event(client: &AsyncClient, topic: &str, op: &str, zone_id: u8) {
    let msg = MqttZoneEvent {
        now: now_epoch_ms(),
        op: op.to_string(),
        zone: zone_id,
    };
    publish_json(client, topic, &msg, false).await;
}

async fn publish_program_event(client: &AsyncClient, topic: &str, op: &str, program: String) {
    let msg = MqttProgramEvent {
        now: now_epoch_ms(),
        op: op.to_string(),
        program,
    };
    publish_json(client, topic, &msg, false).await;
}

async fn publish_cmd_ack(
    client: &AsyncClient,
    topic: &str,
    success: bool,
    src: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
) {
    let msg = MqttCmdAck {
        now: now_epoch_ms(),
        op: "CMD_ACK".to_string(),
        success,
        src,
        data,
    };
    publish_json(client, topic, &msg, false).await;
}

async fn build_snapshot(controller: &RainbirdController, zone_names: &HashMap<u8, String>) -> MqttSnapshot {
    let mut zones = Vec::new();
    for id in controller.zones() {
        let Some(status) = controller.zone_status(id).await else {
            continue;
        };
        zones.push(MqttZoneState {
            id,
            name: zone_label(id, zone_names),
            active: status.active,
            running: status.running,
            enabled: status.enabled,
            remaining: controller.remaining_duration(Some(id)).await,
        });
    }

    let program = controller.last_snapshot().await.and_then(|s| s.active_program_id);

    MqttSnapshot {
        now: now_epoch_ms(),
        op: "SNAPSHOT".to_string(),
        state: MqttSnapshotState {
            model: controller.model_name().to_string(),
            version: controller.version().to_string(),
            serial: controller.serial_number().to_string(),
            rain_set_point_reached: controller.rain_set_point_reached().await.unwrap_or(false),
            program,
            zones,
        },
    }
}

async fn publish_snapshot(
    client: &AsyncClient,
    topic: &str,
    controller: &RainbirdController,
    zone_names: &HashMap<u8, String>,
) {
    let snapshot = build_snapshot(controller, zone_names).await;
    publish_json(client, topic, &snapshot, true).await;
}

// ---------------------------------------------------------------------------
// Controller event → MQTT
// ---------------------------------------------------------------------------

async fn handle_controller_event(
    event: ControllerEvent,
    running_zone: &mut u8,
    client: &AsyncClient,
    topic: &str,
    controller: &RainbirdController,
    zone_names: &HashMap<u8, String>,
) {
    match event {
        ControllerEvent::StatusChanged(snapshot) => {
            if snapshot.active_zone_id != *running_zone {
                if *running_zone != 0 {
                    info!("Zone {} ({}) stopped", running_zone, zone_label(*running_zone, zone_names));
                    publish_zone_event(client, topic, "ZONE_STOPPED", *running_zone).await;
                }
                if snapshot.active_zone_id != 0 {
                    let id = snapshot.active_zone_id;
                    info!("Zone {id} ({}) running", zone_label(id, zone_names));
                    publish_zone_event(client, topic, "ZONE_RUNNING", id).await;
                }
                *running_zone = snapshot.active_zone_id;
                publish_snapshot(client, topic, controller, zone_names).await;
            }
        }

        ControllerEvent::RainSensorChanged { set_point_reached } => {
            info!("Rain sensor set point reached: {set_point_reached}");
            let msg = MqttRainSensorEvent {
                now: now_epoch_ms(),
                op: "RAIN_SENSOR".to_string(),
                set_point_reached,
            };
            publish_json(client, topic, &msg, false).await;
        }

        ControllerEvent::ZoneEnableChanged { zone, enabled } => {
            let op = if enabled { "ZONE_ENABLED" } else { "ZONE_DISABLED" };
            publish_zone_event(client, topic, op, zone).await;
        }

        ControllerEvent::ProgramStarted { program } => {
            info!("Program {program} started");
            publish_program_event(client, topic, "PROGRAM_STARTED", program).await;
        }

        ControllerEvent::ProgramCompleted { program } => {
            info!("Program {program} completed");
            publish_program_event(client, topic, "PROGRAM_COMPLETED", program).await;
        }

        ControllerEvent::Initialized => {
            info!("Controller initialized, publishing snapshot");
            publish_snapshot(client, topic, controller, zone_names).await;
        }
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

/// Run a controller command and log the result. Returns `true` on success.
async fn exec_controller_cmd<E: std::fmt::Display>(
    op: &str,
    label: &str,
    fut: impl std::future::Future<Output = std::result::Result<(), E>>,
) -> bool {
    match fut.await {
        Ok(()) => {
            info!("{op} {label}: success");
            true
        }
        Err(e) => {
            error!("{op} {label} failed: {e}");
            false
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_command(
    payload_str: &str,
    cmd: MqttCommand,
    client: &AsyncClient,
    topic: &str,
    controller: &RainbirdController,
    zone_names: &HashMap<u8, String>,
    default_duration_secs: u32,
) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload_str).ok();
    let op = cmd.op.as_str();

    let needs_zone = matches!(op, "ACTIVATE_ZONE" | "DEACTIVATE_ZONE" | "ENABLE_ZONE");
    let zone = match cmd.zone {
        Some(id) => id,
        None if needs_zone => {
            warn!("{op}: missing zone");
            publish_cmd_ack(client, topic, false, src_json, None).await;
            return;
        }
        None => 0,
    };

    let success = match op {
        "SNAPSHOT" => {
            debug!("Command: SNAPSHOT");
            let snapshot = build_snapshot(controller, zone_names).await;
            let snapshot_value = serde_json::to_value(&snapshot).ok();
            publish_json(client, topic, &snapshot, true).await;
            publish_cmd_ack(client, topic, true, src_json, snapshot_value).await;
            return;
        }

        "PING" => true,

        "REFRESH" => exec_controller_cmd(op, "status", controller.refresh_status()).await,

        "ACTIVATE_ZONE" => {
            let duration = cmd.duration.unwrap_or(default_duration_secs);
            let label = format!("zone {zone} for {duration}s");
            exec_controller_cmd(op, &label, controller.activate_zone(zone, duration)).await
        }

        "DEACTIVATE_ZONE" => {
            let label = format!("zone {zone}");
            exec_controller_cmd(op, &label, controller.deactivate_zone(zone)).await
        }

        "DEACTIVATE_ALL" => {
            controller.deactivate_all_zones().await;
            true
        }

        "ENABLE_ZONE" => {
            let enabled = cmd.enabled.unwrap_or(true);
            let label = format!("zone {zone} enabled={enabled}");
            exec_controller_cmd(op, &label, controller.enable_zone(zone, enabled)).await
        }

        "START_PROGRAM" => match cmd.program.as_deref() {
            Some(program) => {
                let label = format!("program {program}");
                exec_controller_cmd(op, &label, controller.start_program(program)).await
            }
            None => {
                warn!("{op}: missing program");
                false
            }
        },

        "STOP" => exec_controller_cmd(op, "irrigation", controller.stop_irrigation()).await,

        "RAIN_DELAY" => match cmd.days {
            Some(days) => {
                let label = format!("{days} days");
                exec_controller_cmd(op, &label, controller.set_rain_delay(days)).await
            }
            None => match controller.rain_delay().await {
                Ok(days) => {
                    let data = serde_json::json!({ "days": days });
                    publish_cmd_ack(client, topic, true, src_json, Some(data)).await;
                    return;
                }
                Err(e) => {
                    error!("{op} failed: {e}");
                    false
                }
            },
        },

        other => {
            warn!("Unknown command: {other}");
            false
        }
    };

    publish_cmd_ack(client, topic, success, src_json, None).await;
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=rainbird_lan_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let mut session = load_session(&cli.config)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        info!("Connecting to RainBird controller at {}", session.controller_config.host);
        let controller = Arc::new(RainbirdController::connect(session.controller_config.clone()).await?);
        info!(
            "Controller {} ready ({} zones)",
            controller.model_name(),
            controller.zones().len()
        );

        if session.sync_clock
            && let Err(e) = controller.sync_clock().await
        {
            warn!("Failed to set controller clock: {e}");
        }

        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&session.mqtt_client_id, &session.mqtt_host, session.mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        client
            .subscribe(&session.subscribe_topic, QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to MQTT topic")?;
        info!("MQTT: subscribed to {}", session.subscribe_topic);

        publish_snapshot(&client, &session.publish_topic, &controller, &session.zone_names).await;

        // Task 1: Controller event listener
        let controller_events = Arc::clone(&controller);
        let client_events = client.clone();
        let topic_events = session.publish_topic.clone();
        let zn_events = Arc::clone(&session.zone_names);
        let mut event_rx = controller.subscribe();
        let event_handle = tokio::spawn(async move {
            let mut running_zone = 0u8;
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        handle_controller_event(
                            event,
                            &mut running_zone,
                            &client_events,
                            &topic_events,
                            &controller_events,
                            &zn_events,
                        )
                        .await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed");
                        break;
                    }
                }
            }
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let controller_cmds = Arc::clone(&controller);
        let client_cmds = client.clone();
        let topic_cmds = session.publish_topic.clone();
        let zn_cmds = Arc::clone(&session.zone_names);
        let sub_topic = session.subscribe_topic.clone();
        let default_duration_secs = session.default_duration_secs;
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // rumqttc does not resubscribe after a broker reconnect
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload);
                            match serde_json::from_str::<MqttCommand>(&payload) {
                                Ok(cmd) => {
                                    if cmd.op == "SNAPSHOT" {
                                        debug!("MQTT command received: {payload}");
                                    } else {
                                        info!("MQTT command received: {payload}");
                                    }
                                    handle_command(
                                        &payload,
                                        cmd,
                                        &client_cmds,
                                        &topic_cmds,
                                        &controller_cmds,
                                        &zn_cmds,
                                        default_duration_secs,
                                    )
                                    .await;
                                }
                                Err(e) => {
                                    warn!("Failed to parse MQTT command: {e}");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Task 3: Periodic retained snapshot
        let controller_snap = Arc::clone(&controller);
        let client_snap = client.clone();
        let topic_snap = session.publish_topic.clone();
        let zn_snap = Arc::clone(&session.zone_names);
        let snapshot_interval_secs = session.snapshot_interval_secs;
        let snap_handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(snapshot_interval_secs));
            // Skip the first immediate tick (we already published an initial snapshot)
            ticker.tick().await;
            loop {
                ticker.tick().await;
                publish_snapshot(&client_snap, &topic_snap, &controller_snap, &zn_snap).await;
            }
        });

        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting connections...");
                true
            }
        };

        event_handle.abort();
        mqtt_handle.abort();
        snap_handle.abort();

        // The controller stops its background tasks once the last handle is dropped
        drop(controller);

        if !restart {
            break;
        }

        // Keep the previous config if the new one is unusable
        info!("Reloading config from {}", cli.config);
        match load_session(&cli.config) {
            Ok(new_session) => {
                session = new_session;
                info!("Config reloaded successfully");
            }
            Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mqtt_url() {
        assert_eq!(parse_mqtt_url("mqtt://broker:1883").unwrap(), ("broker".to_string(), 1883));
        assert_eq!(parse_mqtt_url("tcp://10.0.0.2:8883").unwrap(), ("10.0.0.2".to_string(), 8883));
        assert!(parse_mqtt_url("mqtt://broker").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str(
            r#"
            [controller]
            host = "192.168.1.20"
            password = "secret"

            [mqtt]
            url = "mqtt://localhost:1883"

            [zone_names]
            1 = "Front lawn"
            3 = "Vegetables"
            "#,
        )
        .unwrap();

        assert_eq!(config.controller.refresh_rate_secs, 60);
        assert_eq!(config.controller.retry_delay_ms, 30000);
        assert_eq!(config.controller.job_timeout_secs, 3600);
        assert_eq!(config.controller.max_clock_drift_secs, 300);
        assert_eq!(config.controller.default_duration_secs, 600);
        assert!(!config.controller.sync_clock);
        assert_eq!(config.mqtt.publish_topic, "rainbird");
        assert_eq!(config.mqtt.subscribe_topic, "rainbird/cmd");
        assert_eq!(zone_label(1, &config.zone_names), "Front lawn");
        assert_eq!(zone_label(2, &config.zone_names), "Zone 2");

        let controller = build_controller_config(&config.controller);
        assert_eq!(controller.host, "192.168.1.20");
        assert_eq!(controller.refresh_debounce_ms, 1000);
    }

    #[test]
    fn test_invalid_zone_name_key() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [controller]
            host = "h"
            password = "p"

            [mqtt]
            url = "mqtt://localhost:1883"

            [zone_names]
            front = "Front lawn"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_command_parsing() {
        let cmd: MqttCommand =
            serde_json::from_str(r#"{"op":"ACTIVATE_ZONE","zone":3,"duration":300}"#).unwrap();
        assert_eq!(cmd.op, "ACTIVATE_ZONE");
        assert_eq!(cmd.zone, Some(3));
        assert_eq!(cmd.duration, Some(300));
        assert_eq!(cmd.program, None);
    }
}
