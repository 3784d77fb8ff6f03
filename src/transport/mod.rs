// MIT License - Copyright (c) 2026 Peter Wright
// Controller transports

pub mod dispatcher;
pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Command, Reply};

/// A single-attempt request/reply exchange with the controller.
///
/// Implementations do not retry; [`dispatcher::Dispatcher`] owns the
/// retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one command and wait for its decoded reply.
    async fn call(&self, command: &Command) -> Result<Reply>;
}
