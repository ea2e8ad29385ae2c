//! Message handler: the orchestrator consuming inbound message events.

use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::KvStore;
use crate::config::Config;
use crate::gemini::ChatModel;
use crate::transport::{InboundMessage, Transport};

use super::commands::{self, Command, Parsed};
use super::history::{HistoryStore, HistoryWrite, HistoryWriter};
use super::overrides::OverrideStore;
use super::policy::{self, SenderIdentity};
use super::schedule;

/// Fixed user-visible text sent when the model capability fails.
pub const FALLBACK_REPLY: &str = "❌ I ran into an error processing that.";

/// Orchestrates one inbound event end to end: filter, policy, model call,
/// reply relay, and the fire-and-forget history append.
pub struct MessageHandler<S, M, T> {
    config: Arc<Config>,
    model: M,
    transport: T,
    overrides: OverrideStore<S>,
    history: HistoryStore<S>,
    writer: HistoryWriter,
}

impl<S, M, T> MessageHandler<S, M, T>
where
    S: KvStore,
    M: ChatModel,
    T: Transport,
{
    pub fn new(
        config: Arc<Config>,
        model: M,
        transport: T,
        overrides: OverrideStore<S>,
        history: HistoryStore<S>,
        writer: HistoryWriter,
    ) -> Self {
        Self { config, model, transport, overrides, history, writer }
    }

    /// Handle one inbound message event.
    pub async fn handle(&self, msg: InboundMessage) {
        let now = schedule::local_time(self.config.timezone);
        self.handle_at(msg, now).await;
    }

    /// Same as [`handle`](Self::handle) with an explicit wall time.
    pub async fn handle_at(&self, msg: InboundMessage, now: NaiveTime) {
        if msg.is_group {
            return;
        }

        let text = msg.text.trim();
        if text.is_empty() {
            return;
        }

        let sender = SenderIdentity::resolve(&msg.sender, &self.config);
        info!(
            "📨 {} ({}): \"{}\"",
            msg.push_name.as_deref().unwrap_or("?"),
            sender.user_id,
            text.chars().take(50).collect::<String>()
        );

        // Command dispatch is gated on both an active mode and sender
        // privilege; prefix-bearing text from anyone else falls through to
        // the normal chat path.
        if let Some(stripped) = text.strip_prefix(&self.config.prefix)
            && self.config.mode.commands_enabled()
            && sender.privileged
        {
            self.dispatch_command(stripped, &msg, &sender).await;
            return;
        }

        if !policy::should_respond(&sender, now, self.config.mode, &self.overrides).await {
            debug!("💤 Not responding to {}", sender.user_id);
            return;
        }

        let history = self.history.load(&sender.user_id).await;
        debug!("Seeding session with {} prior turn(s)", history.len());

        let (reply, record) = match self.model.reply(&history, text).await {
            Ok(reply) => (reply, true),
            Err(e) => {
                error!("Model error for user {}: {e}", sender.user_id);
                (FALLBACK_REPLY.to_string(), false)
            }
        };

        if let Err(e) = self.transport.send_reply(&reply, &msg.reference()).await {
            warn!("Failed to send reply to {}: {e}", sender.user_id);
            return;
        }

        // Fire-and-forget: the reply is already out, the append happens on
        // the background writer. Fallback replies are not recorded.
        if record {
            self.writer.enqueue(HistoryWrite {
                user_id: sender.user_id,
                query: text.to_string(),
                response_text: reply,
            });
        }
    }

    async fn dispatch_command(
        &self,
        input: &str,
        msg: &InboundMessage,
        sender: &SenderIdentity,
    ) {
        match commands::parse(input) {
            Parsed::Command(Command::Chatbot(state)) => {
                // Independent privilege check, kept separate from the
                // dispatch gate above.
                if !sender.privileged {
                    return;
                }
                let reply = match self.overrides.set(state).await {
                    Ok(()) => {
                        info!("🔧 Override set to {state:?} by {}", sender.user_id);
                        commands::confirmation(state)
                    }
                    Err(e) => {
                        warn!("Failed to set override: {e}");
                        commands::CONFIRM_FAILED
                    }
                };
                if let Err(e) = self.transport.send_reply(reply, &msg.reference()).await {
                    warn!("Failed to send command reply: {e}");
                }
            }
            Parsed::Malformed { usage } => {
                if let Err(e) = self.transport.send_reply(usage, &msg.reference()).await {
                    warn!("Failed to send usage reply: {e}");
                }
            }
            Parsed::Unknown => {
                debug!("Unknown command from {}: {input:?}", sender.user_id);
            }
        }
    }
}
