//! Chat session state and the per-message consumer loops.
//!
//! A [`ChatSession`] owns the visible message list and, for each message
//! still streaming, an ordered queue of pending sub-chunks. Fragments are
//! enqueued as they arrive; at most one consumer loop per message drains
//! its queue and reveals text one character at a time. The `done` flag set
//! by the end-of-stream sentinel (or a transport error/timeout) is
//! reconciled by the loop: the message finalizes only once the queue is
//! drained, or immediately if the queue is already idle.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use festchat_core::{decode_fragment, split_chunks, ChatMessage, DecodedFragment, MessageId};

use crate::config::{RendererConfig, TypingSpeed};

/// Outcome of handing one raw fragment to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Fragment text was queued for reveal.
    Queued,
    /// Fragment was the end-of-stream sentinel.
    Done,
    /// Fragment carried nothing displayable, or its message is unknown
    /// or already finalized.
    Ignored,
}

/// Pending sub-chunks for one streaming message.
///
/// Created on the first received fragment, removed once drained with the
/// `done` flag set. `processing` is the re-entrancy guard: true while a
/// consumer loop is draining this queue.
struct ChunkQueue {
    chunks: VecDeque<String>,
    processing: bool,
    done: bool,
    speed: TypingSpeed,
}

impl ChunkQueue {
    fn new(speed: TypingSpeed) -> Self {
        Self {
            chunks: VecDeque::new(),
            processing: false,
            done: false,
            speed,
        }
    }
}

struct SessionState {
    messages: Vec<ChatMessage>,
    queues: HashMap<MessageId, ChunkQueue>,
    /// Cancelled and replaced on `reset`; consumer loops hold a clone and
    /// exit at their next suspension point.
    cancel: CancellationToken,
}

struct Inner {
    config: RendererConfig,
    state: Mutex<SessionState>,
    view: watch::Sender<Vec<ChatMessage>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.view.send_replace(state.messages.clone());
    }
}

/// One chat conversation: the visible message list plus streaming state.
///
/// Explicitly constructed and owned (no global state); cheap to clone.
/// Consumer loops run as tokio tasks, so fragment and greeting calls must
/// happen inside a tokio runtime.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    /// Create an empty session with the given renderer configuration.
    pub fn new(config: RendererConfig) -> Self {
        let (view, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SessionState {
                    messages: Vec::new(),
                    queues: HashMap::new(),
                    cancel: CancellationToken::new(),
                }),
                view,
            }),
        }
    }

    /// Subscribe to message-list snapshots. A new value is published after
    /// every revealed character and every structural change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.inner.view.subscribe()
    }

    /// Current snapshot of the message list.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().messages.clone()
    }

    /// Append a finalized user message.
    pub fn push_user(&self, content: impl Into<String>) -> MessageId {
        self.push_message(ChatMessage::user(content))
    }

    /// Append an already-finalized bot message (static notices such as the
    /// transport-open failure reply). No typing animation.
    pub fn push_bot_notice(&self, content: impl Into<String>) -> MessageId {
        self.push_message(ChatMessage::bot(content))
    }

    /// Allocate a new empty bot message with the streaming flag set and
    /// append it to the visible list. Returns immediately.
    pub fn start_bot_message(&self) -> MessageId {
        self.push_message(ChatMessage::bot_streaming())
    }

    fn push_message(&self, message: ChatMessage) -> MessageId {
        let id = message.id.clone();
        let mut state = self.inner.lock();
        state.messages.push(message);
        self.inner.publish(&state);
        id
    }

    /// Handle one raw transport fragment for a streaming message.
    ///
    /// Decodes the payload (JSON shapes, raw-text fallback, `[DONE]`
    /// sentinel), splits the text into bounded sub-chunks, enqueues them,
    /// and ensures exactly one consumer loop is draining the queue.
    /// Idempotent with respect to the loop: a fragment arriving while a
    /// loop is active never starts a second one.
    pub fn receive_fragment(&self, id: &MessageId, raw: &str) -> FragmentOutcome {
        match decode_fragment(raw) {
            DecodedFragment::Done => {
                self.mark_done(id);
                FragmentOutcome::Done
            }
            DecodedFragment::Text(text) => self.enqueue(id, &text, TypingSpeed::Normal),
            DecodedFragment::Raw(text) => {
                debug!(message_id = %id, len = text.len(),
                    "fragment payload was not valid JSON; treating as literal text");
                self.enqueue(id, &text, TypingSpeed::Normal)
            }
            DecodedFragment::Empty => FragmentOutcome::Ignored,
        }
    }

    /// Signal logical end-of-stream for a message. If its queue is already
    /// drained and idle the message finalizes immediately; otherwise the
    /// consumer loop finalizes it after revealing the last character.
    ///
    /// Also the forced-finalization entry point for transport errors and
    /// the stream timeout: already-queued text still types out, and the
    /// message can never stay stuck with the streaming flag set.
    pub fn mark_done(&self, id: &MessageId) {
        let mut state = self.inner.lock();
        let Some(pos) = state
            .messages
            .iter()
            .position(|m| m.id == *id && m.streaming)
        else {
            return;
        };

        if let Some(queue) = state.queues.get_mut(id) {
            queue.done = true;
            if queue.processing || !queue.chunks.is_empty() {
                // Deferred: the consumer loop finalizes after draining.
                return;
            }
        }

        state.queues.remove(id);
        state.messages[pos].finalize();
        self.inner.publish(&state);
        trace!(message_id = %id, "message finalized on done signal");
    }

    /// Finalize a message immediately, discarding any sub-chunks that
    /// have not been revealed yet. If nothing was revealed the static
    /// notice becomes the content; text already revealed is kept as-is.
    ///
    /// Used when the transport fails to open the stream at all.
    pub fn fail_message(&self, id: &MessageId, notice: &str) {
        let mut state = self.inner.lock();
        state.queues.remove(id);
        if let Some(msg) = state
            .messages
            .iter_mut()
            .find(|m| m.id == *id && m.streaming)
        {
            if msg.content.is_empty() {
                msg.content = notice.to_owned();
            }
            msg.finalize();
            self.inner.publish(&state);
            debug!(message_id = %id, "message force-finalized");
        }
    }

    /// Start a bot greeting revealed at the faster greeting speed and
    /// finalized once fully typed.
    pub fn push_greeting(&self, content: impl Into<String>) -> MessageId {
        let id = self.start_bot_message();
        self.enqueue(&id, &content.into(), TypingSpeed::Greeting);
        self.mark_done(&id);
        id
    }

    /// Clear all messages and queues and stop every consumer loop.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.queues.clear();
        state.messages.clear();
        self.inner.publish(&state);
        debug!("chat session reset");
    }

    fn enqueue(&self, id: &MessageId, text: &str, speed: TypingSpeed) -> FragmentOutcome {
        let sub_chunks = split_chunks(text, self.inner.config.max_chunk_chars);
        if sub_chunks.is_empty() {
            return FragmentOutcome::Ignored;
        }

        let mut state = self.inner.lock();
        // Fragments for unknown or already-finalized messages are dropped.
        if !state
            .messages
            .iter()
            .any(|m| m.id == *id && m.streaming)
        {
            return FragmentOutcome::Ignored;
        }

        let queue = state
            .queues
            .entry(id.clone())
            .or_insert_with(|| ChunkQueue::new(speed));
        queue.chunks.extend(sub_chunks);

        if !queue.processing {
            queue.processing = true;
            let inner = Arc::clone(&self.inner);
            let id = id.clone();
            let cancel = state.cancel.clone();
            tokio::spawn(drain_queue(inner, id, cancel));
        }

        FragmentOutcome::Queued
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

/// Consumer loop for one message's chunk queue.
///
/// Dequeues sub-chunks FIFO and reveals them one character at a time,
/// publishing the view after every character. On an empty queue: finalize
/// and discard the queue if `done` is set, otherwise clear the
/// re-entrancy guard and exit (the next fragment restarts the loop). Both
/// the guard handoff and the done check happen under the state lock, so a
/// racing `receive_fragment` either sees `processing == false` or its
/// chunk is seen by this loop.
async fn drain_queue(inner: Arc<Inner>, id: MessageId, cancel: CancellationToken) {
    loop {
        let (chunk, delay) = {
            let mut state = inner.lock();
            if cancel.is_cancelled() {
                return;
            }
            let Some(queue) = state.queues.get_mut(&id) else {
                return;
            };
            match queue.chunks.pop_front() {
                Some(chunk) => {
                    let delay = queue.speed.char_delay(&inner.config);
                    (chunk, delay)
                }
                None => {
                    if queue.done {
                        state.queues.remove(&id);
                        if let Some(msg) = state.messages.iter_mut().find(|m| m.id == id) {
                            msg.finalize();
                        }
                        inner.publish(&state);
                        trace!(message_id = %id, "message finalized after drain");
                    } else {
                        queue.processing = false;
                    }
                    return;
                }
            }
        };

        for ch in chunk.chars() {
            {
                let mut state = inner.lock();
                if cancel.is_cancelled() {
                    return;
                }
                if let Some(msg) = state.messages.iter_mut().find(|m| m.id == id && m.streaming) {
                    msg.content.push(ch);
                }
                inner.publish(&state);
            }
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festchat_core::ChatRole;
    use std::time::Duration;

    async fn wait_for_final(session: &ChatSession, id: &MessageId) -> ChatMessage {
        let mut rx = session.subscribe();
        loop {
            let finalized = rx
                .borrow()
                .iter()
                .find(|m| m.id == *id && !m.streaming)
                .cloned();
            if let Some(msg) = finalized {
                return msg;
            }
            rx.changed().await.expect("view channel closed");
        }
    }

    /// Wait until at least `min_len` bytes of content are revealed. The
    /// watch channel only retains the latest snapshot, so exact
    /// intermediate values can be missed; lengths are monotonic.
    async fn wait_for_min_len(session: &ChatSession, id: &MessageId, min_len: usize) {
        let mut rx = session.subscribe();
        loop {
            let revealed = rx
                .borrow()
                .iter()
                .find(|m| m.id == *id)
                .map(|m| m.content.len())
                .unwrap_or(0);
            if revealed >= min_len {
                return;
            }
            rx.changed().await.expect("view channel closed");
        }
    }

    async fn wait_for_content(session: &ChatSession, id: &MessageId, expected: &str) {
        let mut rx = session.subscribe();
        loop {
            let matched = rx
                .borrow()
                .iter()
                .any(|m| m.id == *id && m.content == expected);
            if matched {
                return;
            }
            rx.changed().await.expect("view channel closed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_world_scenario() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        assert_eq!(
            session.receive_fragment(&id, "Hello world"),
            FragmentOutcome::Queued
        );
        session.mark_done(&id);

        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, "Hello world");
        assert!(!msg.streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_equals_concatenation() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        session.receive_fragment(&id, r#"{"text":"The quick "}"#);
        session.receive_fragment(&id, "brown fox ");
        session.receive_fragment(&id, r#"{"delta":{"content":"jumps over"}}"#);
        assert_eq!(
            session.receive_fragment(&id, "[DONE]"),
            FragmentOutcome::Done
        );

        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, "The quick brown fox jumps over");
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_fragments_no_double_reveal() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        // Two enqueues before the consumer loop ever runs: the second must
        // not start a second loop, or characters would be revealed twice.
        session.receive_fragment(&id, "AAAA");
        session.receive_fragment(&id, "BBBB");
        session.mark_done(&id);

        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, "AAAABBBB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_before_first_char_revealed() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        // Sentinel arrives before the loop has revealed anything.
        session.receive_fragment(&id, "AB");
        session.mark_done(&id);

        // Not finalized synchronously: both characters must be revealed.
        assert!(session
            .messages()
            .iter()
            .any(|m| m.id == id && m.streaming));

        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, "AB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_on_idle_finalizes_immediately() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        session.receive_fragment(&id, "Hi");
        wait_for_content(&session, &id, "Hi").await;

        // Let the consumer loop observe the empty queue and exit.
        tokio::time::sleep(Duration::from_millis(100)).await;

        session.mark_done(&id);
        // Finalized synchronously, no scheduling round-trip needed.
        let msg = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("message present");
        assert!(!msg.streaming);
        assert_eq!(msg.content, "Hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_fragment_split_into_sub_chunks() {
        let session = ChatSession::default();
        let id = session.start_bot_message();

        let text: String = ('a'..='z').cycle().take(300).collect();
        session.receive_fragment(&id, text.as_str());

        // Consumer task was spawned but has not run yet (no await since
        // the call): all three sub-chunks are still queued.
        {
            let state = session.inner.lock();
            let queue = state.queues.get(&id).expect("queue exists");
            assert_eq!(queue.chunks.len(), 3);
            assert!(queue.processing);
        }

        session.mark_done(&id);
        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_stream_freezes_view() {
        let session = ChatSession::default();
        let id = session.start_bot_message();
        session.receive_fragment(&id, "this text will be interrupted");

        wait_for_min_len(&session, &id, 2).await;
        session.reset();
        assert!(session.messages().is_empty());

        // Consumer loop was mid-delay; give it time to wake up. Nothing
        // may be appended to the discarded list.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(session.messages().is_empty());
        assert!(session.subscribe().borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_after_finalize_are_ignored() {
        let session = ChatSession::default();
        let id = session.start_bot_message();
        session.receive_fragment(&id, "done");
        session.mark_done(&id);
        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, "done");

        assert_eq!(
            session.receive_fragment(&id, "late"),
            FragmentOutcome::Ignored
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        let msg = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("message present");
        assert_eq!(msg.content, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_message_is_ignored() {
        let session = ChatSession::default();
        let id = MessageId::generate();
        assert_eq!(
            session.receive_fragment(&id, "orphan"),
            FragmentOutcome::Ignored
        );
        assert!(session.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_payload_is_ignored() {
        let session = ChatSession::default();
        let id = session.start_bot_message();
        assert_eq!(session.receive_fragment(&id, ""), FragmentOutcome::Ignored);
        assert_eq!(
            session.receive_fragment(&id, r#"{"count":7}"#),
            FragmentOutcome::Ignored
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_types_out_and_finalizes() {
        let session = ChatSession::default();
        let greeting = "Hello! I'm your FestFlex assistant. How can I help you today?";
        let id = session.push_greeting(greeting);

        let msg = wait_for_final(&session, &id).await;
        assert_eq!(msg.content, greeting);
        assert_eq!(msg.role, ChatRole::Bot);
    }

    #[tokio::test]
    async fn test_bot_notice_is_immediate() {
        let session = ChatSession::default();
        let id = session.push_bot_notice("backend unavailable");
        let msg = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("notice present");
        assert!(!msg.streaming);
        assert_eq!(msg.content, "backend unavailable");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_message_on_empty_bubble_shows_notice() {
        let session = ChatSession::default();
        let id = session.start_bot_message();
        session.fail_message(&id, "backend unreachable");

        let msg = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("message present");
        assert!(!msg.streaming);
        assert_eq!(msg.content, "backend unreachable");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_message_keeps_revealed_content() {
        let session = ChatSession::default();
        let id = session.start_bot_message();
        session.receive_fragment(&id, "partial reply text");
        wait_for_min_len(&session, &id, 2).await;

        session.fail_message(&id, "ignored notice");
        let msg = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("message present");
        assert!(!msg.streaming);
        assert!(msg.content.starts_with("pa"));
        assert_ne!(msg.content, "ignored notice");

        // Any character still mid-flight must not land after finalize.
        let len = msg.content.len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let after = session
            .messages()
            .into_iter()
            .find(|m| m.id == id)
            .expect("message present");
        assert_eq!(after.content.len(), len);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_messages_stream_independently() {
        let session = ChatSession::default();
        let first = session.start_bot_message();
        let second = session.start_bot_message();

        session.receive_fragment(&first, "one");
        session.receive_fragment(&second, "two");
        session.mark_done(&first);
        session.mark_done(&second);

        let a = wait_for_final(&session, &first).await;
        let b = wait_for_final(&session, &second).await;
        assert_eq!(a.content, "one");
        assert_eq!(b.content, "two");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_message_then_bot_reply_ordering() {
        let session = ChatSession::default();
        session.push_user("what events are coming up?");
        let id = session.start_bot_message();
        session.receive_fragment(&id, "Three events this week.");
        session.mark_done(&id);
        wait_for_final(&session, &id).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Bot);
    }
}
