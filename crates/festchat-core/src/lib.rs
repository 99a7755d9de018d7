//! Festchat Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtime specifics
//! - Terminal rendering
//!
//! All types here represent the core domain of the festchat client:
//! chat messages, identifiers, and transport fragment decoding.

pub mod chat;
pub mod fragment;
pub mod ids;

// Re-export commonly used types
pub use chat::{ChatMessage, ChatRole};
pub use fragment::{decode_fragment, split_chunks, DecodedFragment, DONE_SENTINEL};
pub use ids::{MessageId, SessionId};
