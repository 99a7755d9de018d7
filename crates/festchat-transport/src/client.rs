//! Chat client: outbound request construction and SSE stream pumping.
//!
//! One server-push connection is opened per outgoing user message. The
//! reply bubble is created before the request goes out, so the user sees
//! it immediately; the stream pump then feeds fragments into the renderer
//! until the sentinel, an error, or the hard deadline.

use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use festchat_core::{MessageId, SessionId};
use festchat_renderer::{ChatSession, FragmentOutcome};

use crate::context::SiteContext;
use crate::error::TransportError;
use crate::sse::SseParser;

/// Streaming endpoint path on the backend.
pub const STREAM_ENDPOINT: &str = "/api/chatbot/stream-words-get";

/// Static reply shown when the stream cannot be opened at all.
const OPEN_FAILURE_REPLY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    pub base_url: String,

    /// Hard deadline per stream, measured from request start. If no
    /// done/error signal arrives in time, the message is force-finalized.
    pub stream_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            stream_timeout: Duration::from_secs(60),
        }
    }
}

/// One continuous conversation exchange, scoped from chat-open to
/// chat-clear. Tracks whether the one-shot site context has been sent.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Session identifier sent with every request.
    pub session_id: SessionId,
    /// True once the site context has accompanied a message.
    pub context_sent: bool,
    /// Unix timestamp (milliseconds) when the conversation started.
    pub started_at_ms: i64,
}

impl Conversation {
    /// Start a fresh conversation.
    pub fn new() -> Self {
        Self {
            session_id: SessionId::generate(),
            context_sent: false,
            started_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// How a stream pump ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    /// End-of-stream sentinel received.
    Done,
    /// Server closed the connection without a sentinel.
    Closed,
    /// Transport error mid-stream.
    Failed,
    /// Hard deadline hit.
    TimedOut,
}

/// HTTP/SSE client for the portal chatbot backend.
pub struct ChatClient {
    http: reqwest::Client,
    config: ClientConfig,
    context: SiteContext,
}

impl ChatClient {
    /// Create a client with the given configuration and the default
    /// site context.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            context: SiteContext::default(),
        }
    }

    /// Replace the site context sent with the first message.
    pub fn with_context(mut self, context: SiteContext) -> Self {
        self.context = context;
        self
    }

    /// Send one user message and stream the bot reply into the session.
    ///
    /// The user message and an empty bot bubble are appended before the
    /// request is made. Whatever happens afterwards, the bubble finalizes:
    /// open failure shows a static notice, mid-stream errors and timeouts
    /// keep whatever text was already revealed.
    pub async fn send_message(
        &self,
        conversation: &mut Conversation,
        session: &ChatSession,
        text: &str,
    ) -> Result<(), TransportError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TransportError::EmptyMessage);
        }

        session.push_user(text);
        let message_id = session.start_bot_message();

        // Site context goes out only with the first message of a session.
        let context_param = if conversation.context_sent {
            String::new()
        } else {
            serde_json::to_string(&self.context)?
        };
        conversation.context_sent = true;

        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            STREAM_ENDPOINT
        );
        debug!(
            url = %url,
            session_id = %conversation.session_id,
            message_id = %message_id,
            "opening chat stream"
        );

        let deadline = Instant::now() + self.config.stream_timeout;
        let request = self
            .http
            .get(&url)
            .query(&[
                ("message", text),
                ("sessionId", conversation.session_id.as_str()),
                ("context", context_param.as_str()),
            ])
            .send();

        let response = match timeout_at(deadline, request).await {
            Err(_) => {
                warn!(message_id = %message_id, "timed out opening chat stream");
                session.fail_message(&message_id, OPEN_FAILURE_REPLY);
                return Err(TransportError::Timeout);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to open chat stream");
                session.fail_message(&message_id, OPEN_FAILURE_REPLY);
                return Err(e.into());
            }
            Ok(Ok(response)) => match response.error_for_status() {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "chat stream rejected by backend");
                    session.fail_message(&message_id, OPEN_FAILURE_REPLY);
                    return Err(e.into());
                }
            },
        };

        let end = pump_stream(session, &message_id, response.bytes_stream(), deadline).await;
        debug!(message_id = %message_id, end = ?end, "chat stream closed");
        Ok(())
    }
}

/// Pump SSE bytes into the renderer until the sentinel, an error, stream
/// close, or the deadline. Every exit path leaves the message finalized
/// (possibly deferred to the consumer loop's natural drain).
async fn pump_stream<S, B, E>(
    session: &ChatSession,
    message_id: &MessageId,
    stream: S,
    deadline: Instant,
) -> StreamEnd
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    tokio::pin!(stream);
    let mut parser = SseParser::new();

    loop {
        match timeout_at(deadline, stream.next()).await {
            Err(_) => {
                warn!(message_id = %message_id, "chat stream timed out; finalizing message");
                session.mark_done(message_id);
                return StreamEnd::TimedOut;
            }
            Ok(None) => {
                debug!(message_id = %message_id, "chat stream closed without sentinel");
                session.mark_done(message_id);
                return StreamEnd::Closed;
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, message_id = %message_id,
                    "chat stream error; finalizing message");
                session.mark_done(message_id);
                return StreamEnd::Failed;
            }
            Ok(Some(Ok(bytes))) => {
                for event in parser.push(bytes.as_ref()) {
                    if session.receive_fragment(message_id, &event.data) == FragmentOutcome::Done {
                        return StreamEnd::Done;
                    }
                }
            }
        }
    }
}
