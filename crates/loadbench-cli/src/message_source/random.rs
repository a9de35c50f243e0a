//! `RandomMessageSource`: a cached, generated conversation asking for a long
//! essay, padded with random filler words until it reaches a target context
//! token count.
//!
//! Built once at construction and cloned out on every `next()` call — the
//! anti-cache prefix is intentionally *not* applied here (see DESIGN.md):
//! `StreamingClient::call` already mutates a fresh copy of whatever
//! `MessageSource` returns, so applying it here too would double the prefix
//! and double-count its tokens.

use loadbench_core::{Content, Error, Message, MessageSource, Result, TokenCounter, TokenCounts};
use rand::Rng;

/// Built-in filler vocabulary; sampled with replacement, so no vocabulary
/// exhaustion bound is needed (unlike the upstream tool's third-of-the-vocab
/// cap, a workaround for a finite, non-repeating word source).
const WORDS: &[&str] = &[
    "amber", "river", "quiet", "signal", "mountain", "lantern", "orbit", "velvet", "harbor",
    "ember", "willow", "cipher", "granite", "echo", "meadow", "falcon", "glacier", "thread",
    "copper", "summit", "hollow", "drift", "cinder", "lattice", "prairie", "quartz", "ripple",
    "timber", "vapor", "anchor", "bramble", "citrus", "dune", "flint", "gossamer", "hearth",
    "ivy", "juniper", "kestrel", "lumen",
];

/// Upper bound on words appended per growth step, mirroring the upstream
/// tool's `min(ceil(remaining/4), max_random_words)` pacing.
const MAX_WORDS_PER_STEP: usize = 64;

pub struct RandomMessageSource {
    cached_messages: Vec<Message>,
    cached_tokens: TokenCounts,
}

impl RandomMessageSource {
    /// `context_tokens` is the target text-token count for the filler
    /// prompt; `max_tokens` is forwarded into a second "write a long essay"
    /// message when present, mirroring the shape-profile presets in §6.
    pub fn new(
        context_tokens: u64,
        max_tokens: Option<u64>,
        token_counter: &dyn TokenCounter,
    ) -> Self {
        let mut messages = vec![Message {
            role: "user".to_string(),
            content: Content::Text(String::new()),
        }];
        if let Some(max_tokens) = max_tokens {
            messages.push(Message {
                role: "user".to_string(),
                content: Content::Text(format!(
                    "write a long essay about life in at least {max_tokens} tokens"
                )),
            });
        }

        let mut rng = rand::rng();
        let mut prompt = String::new();
        loop {
            let (text_tokens, _) = token_counter.count(&messages);
            if text_tokens >= context_tokens {
                break;
            }
            let remaining = context_tokens - text_tokens;
            let words_needed = (remaining.div_ceil(4) as usize).clamp(1, MAX_WORDS_PER_STEP);
            for _ in 0..words_needed {
                let word = WORDS[rng.random_range(0..WORDS.len())];
                prompt.push_str(word);
                prompt.push(' ');
            }
            messages[0].content = Content::Text(prompt.clone());
        }

        let cached_tokens = token_counter.count(&messages);
        Self {
            cached_messages: messages,
            cached_tokens,
        }
    }
}

impl MessageSource for RandomMessageSource {
    fn next(&self) -> Result<(Vec<Message>, TokenCounts)> {
        if self.cached_messages.is_empty() {
            return Err(Error::MessageSource("no cached messages to return".to_string()));
        }
        Ok((self.cached_messages.clone(), self.cached_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordCounter;
    impl TokenCounter for WordCounter {
        fn count(&self, messages: &[Message]) -> TokenCounts {
            let mut n = 0u64;
            for m in messages {
                if let Content::Text(t) = &m.content {
                    n += t.split_whitespace().count() as u64;
                }
            }
            (n, 0)
        }
    }

    #[test]
    fn reaches_at_least_the_requested_context_tokens() {
        let source = RandomMessageSource::new(120, None, &WordCounter);
        let (messages, (text_tokens, _)) = source.next().unwrap();
        assert!(text_tokens >= 120);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn zero_target_yields_empty_filler() {
        let source = RandomMessageSource::new(0, None, &WordCounter);
        let (_, (text_tokens, _)) = source.next().unwrap();
        assert_eq!(text_tokens, 0);
    }

    #[test]
    fn max_tokens_adds_a_second_essay_prompt_message() {
        let source = RandomMessageSource::new(10, Some(500), &WordCounter);
        let (messages, _) = source.next().unwrap();
        assert_eq!(messages.len(), 2);
        match &messages[1].content {
            Content::Text(t) => assert!(t.contains("500 tokens")),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn repeated_calls_return_the_same_cached_conversation() {
        let source = RandomMessageSource::new(50, None, &WordCounter);
        let (a, _) = source.next().unwrap();
        let (b, _) = source.next().unwrap();
        assert_eq!(a, b);
    }
}
