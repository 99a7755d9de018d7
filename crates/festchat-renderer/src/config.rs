//! Renderer configuration.

use std::time::Duration;

/// Streaming renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Per-character delay for normal bot replies.
    pub normal_char_delay: Duration,

    /// Per-character delay for the session greeting (slightly faster).
    pub greeting_char_delay: Duration,

    /// Maximum sub-chunk size in characters. Incoming fragments larger
    /// than this are split so one animation step never reveals more.
    pub max_chunk_chars: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            normal_char_delay: Duration::from_millis(23),
            greeting_char_delay: Duration::from_millis(19),
            max_chunk_chars: 120,
        }
    }
}

/// Reveal speed preset for a streaming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingSpeed {
    /// Faster preset used for the initial greeting.
    Greeting,
    /// Normal preset for all other replies.
    #[default]
    Normal,
}

impl TypingSpeed {
    /// Per-character delay for this preset.
    pub fn char_delay(&self, config: &RendererConfig) -> Duration {
        match self {
            Self::Greeting => config.greeting_char_delay,
            Self::Normal => config.normal_char_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.normal_char_delay, Duration::from_millis(23));
        assert_eq!(config.greeting_char_delay, Duration::from_millis(19));
        assert_eq!(config.max_chunk_chars, 120);
    }

    #[test]
    fn test_greeting_is_faster() {
        let config = RendererConfig::default();
        assert!(
            TypingSpeed::Greeting.char_delay(&config) < TypingSpeed::Normal.char_delay(&config)
        );
    }
}
