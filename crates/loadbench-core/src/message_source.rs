//! External-contract traits the core consumes but does not implement:
//! the message body producer and the token counter.
//!
//! The upstream Python inheritance hierarchy for message generators
//! (`BaseMessagesGenerator` / `RandomMessagesGenerator` / `ReplayMessagesGenerator`)
//! collapses into this single trait; concrete implementations live in the
//! CLI crate, not here, since generating request bodies is explicitly out
//! of scope for the core.

use crate::content::Message;
use crate::error::Result;

/// Token accounting for a list of messages: `(text_tokens, image_tokens)`.
pub type TokenCounts = (u64, u64);

/// Lazily produces the next request body to send. Implementations are
/// consumed serially by a single `StreamingClient` caller; if shared across
/// concurrent workers, they must serialize internal access themselves.
pub trait MessageSource: Send + Sync {
    /// Produce the next `messages` array and its token accounting.
    fn next(&self) -> Result<(Vec<Message>, TokenCounts)>;
}

/// Opaque text/image token counter; used for accounting only.
pub trait TokenCounter: Send + Sync {
    fn count(&self, messages: &[Message]) -> TokenCounts;
}
