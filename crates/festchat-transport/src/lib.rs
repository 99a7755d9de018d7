//! SSE transport for festchat.
//!
//! Opens one server-push connection per outgoing user message and pumps
//! the resulting event stream into the renderer. The connection is closed
//! by the client after the end-of-stream sentinel, an error, or the hard
//! timeout; failures degrade to a finalized message, never a crash.

pub mod client;
pub mod context;
pub mod error;
pub mod sse;

pub use client::{ChatClient, ClientConfig, Conversation};
pub use context::SiteContext;
pub use error::TransportError;
pub use sse::{SseEvent, SseParser};
