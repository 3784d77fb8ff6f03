// MIT License - Copyright (c) 2026 Peter Wright
// Serialized command dispatch with retry

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::constants::DEFAULT_RETRY_DELAY;
use crate::error::{RainbirdError, Result};
use crate::protocol::{Command, Reply};
use crate::transport::Transport;

/// How failed attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait between attempts.
    pub delay: Duration,
    /// Total attempts allowed, `None` to retry forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay.
    pub fn uncapped(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts in total.
    pub fn capped(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    fn allows_another(&self, attempts_made: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts_made < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::uncapped(DEFAULT_RETRY_DELAY)
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or the policy runs out of attempts.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && policy.allows_another(attempts) => {
                warn!(
                    "Attempt {} failed: {}. Retrying in {}s",
                    attempts,
                    e,
                    policy.delay.as_secs_f32()
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sends one command at a time over a [`Transport`], retrying transport
/// failures per the configured [`RetryPolicy`].
///
/// Protocol errors (an explicit JSON-RPC `error`, an undecodable reply) are
/// returned to the caller immediately.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    /// Held for the whole exchange, retries included
    in_flight: Mutex<()>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            in_flight: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a command and wait for its reply.
    pub async fn send(&self, command: &Command) -> Result<Reply> {
        let _guard = self.in_flight.lock().await;

        debug!("Sending command 0x{:02X}: {:?}", command.opcode(), command);
        let reply = retry(&self.policy, RainbirdError::is_retryable, || {
            self.transport.call(command)
        })
        .await?;
        debug!("Received reply: {}", reply);

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;

    /// Replays scripted results and records when each call happened.
    struct ScriptedTransport {
        script: StdMutex<VecDeque<Result<Reply>>>,
        calls: StdMutex<Vec<Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        call_duration: Duration,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Reply>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: StdMutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                call_duration: Duration::ZERO,
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn call(&self, _command: &Command) -> Result<Reply> {
            self.calls.lock().unwrap().push(Instant::now());
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            if !self.call_duration.is_zero() {
                tokio::time::sleep(self.call_duration).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Reply::Acknowledged { command: 0 }))
        }
    }

    fn ack() -> Result<Reply> {
        Ok(Reply::Acknowledged { command: 0x40 })
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_after_delay() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(RainbirdError::HttpStatus { status: 503 }),
            Err(RainbirdError::MissingResult),
            ack(),
        ]));
        let dispatcher = Dispatcher::new(transport.clone(), RetryPolicy::default());

        let reply = dispatcher.send(&Command::StopIrrigation).await.unwrap();
        assert_eq!(reply, Reply::Acknowledged { command: 0x40 });

        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_secs(30));
        assert!(times[2] - times[1] >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_error_returned_without_retry() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(RainbirdError::Rpc {
                code: -32601,
                message: "Method not found".into(),
            }),
            ack(),
        ]));
        let dispatcher = Dispatcher::new(transport.clone(), RetryPolicy::default());

        let err = dispatcher.send(&Command::StopIrrigation).await.unwrap_err();
        assert!(matches!(err, RainbirdError::Rpc { code: -32601, .. }));
        assert_eq!(transport.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capped_policy_gives_up() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(RainbirdError::MissingResult),
            Err(RainbirdError::MissingResult),
            Err(RainbirdError::MissingResult),
            ack(),
        ]));
        let policy = RetryPolicy::capped(Duration::from_secs(1), 2);
        let dispatcher = Dispatcher::new(transport.clone(), policy);

        let err = dispatcher.send(&Command::SerialNumberGet).await.unwrap_err();
        assert!(matches!(err, RainbirdError::MissingResult));
        assert_eq!(transport.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_command_in_flight() {
        let mut transport = ScriptedTransport::new(vec![ack(), ack(), ack()]);
        transport.call_duration = Duration::from_millis(250);
        let transport = Arc::new(transport);
        let dispatcher = Dispatcher::new(transport.clone(), RetryPolicy::default());

        let (a, b, c) = tokio::join!(
            dispatcher.send(&Command::StopIrrigation),
            dispatcher.send(&Command::RainSensorStateGet),
            dispatcher.send(&Command::IrrigationStateGet),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(transport.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_helper_with_plain_errors() {
        let mut failures = 2;
        let policy = RetryPolicy::uncapped(Duration::from_millis(1));
        let result: std::result::Result<u32, String> = retry(
            &policy,
            |e: &String| e == "transient",
            || {
                let outcome = if failures > 0 {
                    failures -= 1;
                    Err("transient".to_string())
                } else {
                    Ok(7)
                };
                async move { outcome }
            },
        )
        .await;
        assert_eq!(result, Ok(7));

        let fatal: std::result::Result<u32, String> =
            retry(&policy, |e: &String| e == "transient", || async { Err("fatal".to_string()) }).await;
        assert_eq!(fatal, Err("fatal".to_string()));
    }
}
