//! `WordTokenCounter`: a dependency-free stand-in for a model-specific
//! tokenizer. Counts whitespace-delimited words in text content and charges
//! a fixed cost per image part, rather than reproducing any one provider's
//! actual tokenizer (explicitly out of scope).

use loadbench_core::{Content, Message, Part, TokenCounter, TokenCounts};

/// Flat per-image token cost, matching the upstream tool's low-detail-mode
/// image cost constant.
pub const IMAGE_TOKEN_COST: u64 = 85;

#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, messages: &[Message]) -> TokenCounts {
        let mut text_tokens = 0u64;
        let mut image_tokens = 0u64;
        for message in messages {
            match &message.content {
                Content::Text(text) => text_tokens += count_words(text),
                Content::Parts(parts) => {
                    for part in parts {
                        match part {
                            Part::Text { text } => text_tokens += count_words(text),
                            Part::ImageUrl { .. } => image_tokens += IMAGE_TOKEN_COST,
                        }
                    }
                }
            }
        }
        (text_tokens, image_tokens)
    }
}

fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadbench_core::ImageUrl;

    #[test]
    fn counts_whitespace_words_in_plain_text() {
        let counter = WordTokenCounter;
        let messages = vec![Message {
            role: "user".to_string(),
            content: Content::Text("the quick brown fox".to_string()),
        }];
        assert_eq!(counter.count(&messages), (4, 0));
    }

    #[test]
    fn charges_fixed_cost_per_image_part() {
        let counter = WordTokenCounter;
        let messages = vec![Message {
            role: "user".to_string(),
            content: Content::Parts(vec![
                Part::Text {
                    text: "describe this".to_string(),
                },
                Part::ImageUrl {
                    image_url: ImageUrl {
                        url: "https://example.com/a.png".to_string(),
                    },
                },
            ]),
        }];
        assert_eq!(counter.count(&messages), (2, IMAGE_TOKEN_COST));
    }

    #[test]
    fn empty_messages_yield_zero_tokens() {
        let counter = WordTokenCounter;
        assert_eq!(counter.count(&[]), (0, 0));
    }
}
