// MIT License - Copyright (c) 2026 Peter Wright
// Encrypted JSON-RPC over HTTP transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{self, RPC_ID, RPC_METHOD, RPC_VERSION, STICK_PATH};
use crate::crypto::RainbirdCrypt;
use crate::error::{RainbirdError, Result};
use crate::protocol::{Command, Reply};
use crate::transport::Transport;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: u64,
    jsonrpc: &'a str,
    method: &'a str,
    params: RpcParams,
}

#[derive(Debug, Serialize)]
struct RpcParams {
    data: String,
    length: usize,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<RpcResult>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Transport that tunnels commands through `POST http://{host}/stick`.
///
/// Each call encodes the command, wraps it in a `tunnelSip` JSON-RPC
/// envelope, encrypts it with a fresh IV and decrypts the reply. Failures
/// are reported once; retrying is left to the dispatcher.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    crypt: RainbirdCrypt,
}

impl HttpTransport {
    /// Create a transport for the controller at `host` (`ip` or `ip:port`).
    pub fn new(host: &str, password: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(constants::CONTENT_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static(constants::USER_AGENT));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            url: format!("http://{}{}", host, STICK_PATH),
            crypt: RainbirdCrypt::new(password),
        })
    }

    /// The endpoint this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the plaintext JSON-RPC request for a command.
    pub fn format_request(command: &Command) -> Result<String> {
        let frame = command.encode();
        let request = RpcRequest {
            id: RPC_ID,
            jsonrpc: RPC_VERSION,
            method: RPC_METHOD,
            params: RpcParams {
                data: hex::encode_upper(&frame),
                length: frame.len(),
            },
        };
        Ok(serde_json::to_string(&request)?)
    }

    /// Parse a decrypted JSON-RPC response into a reply.
    pub fn parse_response(plaintext: &[u8]) -> Result<Reply> {
        let envelope: RpcResponse = serde_json::from_slice(plaintext)?;

        if let Some(error) = envelope.error {
            warn!("Controller returned error {}: {}", error.code, error.message);
            return Err(RainbirdError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = envelope.result.ok_or(RainbirdError::MissingResult)?;
        let payload = hex::decode(result.data.trim())?;
        Ok(Reply::decode(&payload)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, command: &Command) -> Result<Reply> {
        let request = Self::format_request(command)?;
        debug!("Request: {}", request);

        let body = self.crypt.seal(&request)?;
        let response = self.client.post(&self.url).body(body).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RainbirdError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let plaintext = self.crypt.open(&bytes)?;
        debug!("Response: {}", String::from_utf8_lossy(&plaintext));

        Self::parse_response(&plaintext)
    }
}
