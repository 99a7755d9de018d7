//! Streaming message renderer for festchat.
//!
//! Sits between the SSE transport and the rendered message list: fragments
//! arrive via [`ChatSession::receive_fragment`], are split into bounded
//! sub-chunks, and are revealed one character at a time to produce a
//! typing effect. End-of-stream signals are reconciled with in-flight
//! rendering so a message always finalizes after its last character,
//! regardless of arrival order.

pub mod config;
pub mod session;

pub use config::{RendererConfig, TypingSpeed};
pub use session::{ChatSession, FragmentOutcome};
