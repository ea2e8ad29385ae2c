//! HTTP client for the WhatsApp gateway sidecar.
//!
//! The gateway owns the session store, pairing, and wire encryption. It
//! exposes a small JSON surface: POST /connect, POST /pair, POST /reply,
//! and GET /events streaming newline-delimited JSON frames.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{InboundMessage, MessageRef, Transport, TransportError};

/// Delay before re-opening the event stream after it drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the inbound event channel.
const EVENT_BUFFER: usize = 128;

pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    database_path: &'a str,
}

#[derive(Serialize)]
struct PairRequest<'a> {
    number: &'a str,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    text: &'a str,
    quoted: &'a MessageRef,
}

/// Event frames on the NDJSON stream.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayEvent {
    Connected,
    Paired { user: String },
    Message(WireMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
struct WireMessage {
    id: String,
    chat: String,
    sender: String,
    #[serde(default)]
    is_group: bool,
    /// Plain text body of a simple message.
    conversation: Option<String>,
    /// Text body of the extended-text variant (links, quotes).
    extended_text: Option<String>,
    push_name: Option<String>,
}

impl WireMessage {
    /// Text arrives in one of two fields depending on the message kind.
    fn into_inbound(self) -> InboundMessage {
        let text = self
            .conversation
            .filter(|t| !t.is_empty())
            .or(self.extended_text)
            .unwrap_or_default();

        InboundMessage {
            id: self.id,
            chat: self.chat,
            sender: self.sender,
            text,
            is_group: self.is_group,
            push_name: self.push_name,
        }
    }
}

impl GatewayClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(format!("{status}: {body}")));
        }
        Ok(())
    }

    /// Ask the gateway to pair with the given phone number. A no-op on the
    /// gateway side when a session already exists.
    pub async fn pair_phone(&self, number: &str) -> Result<(), TransportError> {
        info!("📱 Requesting pairing for {number}");
        self.post("/pair", &PairRequest { number }).await
    }

    /// Connect the gateway session and start streaming inbound messages.
    ///
    /// The returned receiver yields direct and group messages; connection
    /// and pairing frames are logged here. The stream reconnects with a
    /// fixed delay until the receiver is dropped.
    pub async fn connect(
        &self,
        database_path: &Path,
    ) -> Result<mpsc::Receiver<InboundMessage>, TransportError> {
        let database_path = database_path.to_string_lossy();
        self.post(
            "/connect",
            &ConnectRequest {
                database_path: database_path.as_ref(),
            },
        )
        .await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let events_url = format!("{}/events", self.base_url);
        let http = self.http.clone();

        tokio::spawn(async move {
            loop {
                match stream_events(&http, &events_url, &tx).await {
                    Ok(()) => info!("Event stream ended, reconnecting"),
                    Err(e) => warn!("Event stream error: {e}, reconnecting"),
                }
                if tx.is_closed() {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });

        Ok(rx)
    }
}

/// Read one pass of the NDJSON event stream, forwarding message frames.
async fn stream_events(
    http: &reqwest::Client,
    url: &str,
    tx: &mpsc::Sender<InboundMessage>,
) -> Result<(), TransportError> {
    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(TransportError::Api(response.status().to_string()));
    }

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?
    {
        buf.extend_from_slice(&chunk);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<GatewayEvent>(line) {
                Ok(GatewayEvent::Connected) => info!("✅ Connected successfully"),
                Ok(GatewayEvent::Paired { user }) => info!("🔑 Logged in as {user}"),
                Ok(GatewayEvent::Message(msg)) => {
                    if tx.send(msg.into_inbound()).await.is_err() {
                        // Receiver dropped, shutting down.
                        return Ok(());
                    }
                }
                Ok(GatewayEvent::Unknown) => {}
                Err(e) => warn!("Unparseable gateway frame: {e}"),
            }
        }
    }

    Ok(())
}

impl Transport for GatewayClient {
    async fn send_reply(&self, text: &str, quoted: &MessageRef) -> Result<(), TransportError> {
        self.post("/reply", &ReplyRequest { text, quoted }).await
    }
}
