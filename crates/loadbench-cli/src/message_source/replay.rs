//! `ReplayMessageSource`: samples uniformly from a fixed set of
//! previously-recorded conversations loaded from a JSON file.

use loadbench_core::{Error, Message, MessageSource, Result, TokenCounter, TokenCounts};
use rand::Rng;
use tracing::info;

pub struct ReplayMessageSource {
    entries: Vec<(Vec<Message>, TokenCounts)>,
}

impl ReplayMessageSource {
    /// Load `path`, expecting a JSON array of non-empty message-lists.
    /// Pre-computes token counts for every entry via `token_counter` so
    /// sampling at call time never touches the filesystem.
    pub fn load(path: &str, token_counter: &dyn TokenCounter) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&contents)?;
        let arrays = raw.as_array().ok_or_else(|| {
            Error::MessageSource("replay file must contain a JSON array".to_string())
        })?;
        if arrays.is_empty() {
            return Err(Error::MessageSource(
                "replay file must contain at least one list of messages".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(arrays.len());
        for item in arrays {
            let messages: Vec<Message> = serde_json::from_value(item.clone())?;
            if messages.is_empty() {
                return Err(Error::MessageSource(
                    "replay file must contain a list of valid messages lists".to_string(),
                ));
            }
            let counts = token_counter.count(&messages);
            entries.push((messages, counts));
        }

        let avg_text = entries.iter().map(|(_, (t, _))| *t).sum::<u64>() as f64 / entries.len() as f64;
        let avg_image = entries.iter().map(|(_, (_, i))| *i).sum::<u64>() as f64 / entries.len() as f64;
        info!(
            entries = entries.len(),
            avg_text_tokens = avg_text.round() as u64,
            avg_image_tokens = avg_image.round() as u64,
            "replay messages loaded"
        );

        Ok(Self { entries })
    }
}

impl MessageSource for ReplayMessageSource {
    fn next(&self) -> Result<(Vec<Message>, TokenCounts)> {
        let mut rng = rand::rng();
        let idx = rng.random_range(0..self.entries.len());
        Ok(self.entries[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadbench_core::Content;
    use std::io::Write;

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

    fn write_replay_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_samples_from_valid_file() {
        let file = write_replay_file(
            r#"[[{"role":"user","content":"hello there"}], [{"role":"user","content":"a b c"}]]"#,
        );
        let source = ReplayMessageSource::load(file.path().to_str().unwrap(), &WordCounter).unwrap();
        let (messages, _) = source.next().unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn rejects_non_array_file() {
        let file = write_replay_file(r#"{"not": "an array"}"#);
        assert!(ReplayMessageSource::load(file.path().to_str().unwrap(), &WordCounter).is_err());
    }

    #[test]
    fn rejects_empty_array() {
        let file = write_replay_file("[]");
        assert!(ReplayMessageSource::load(file.path().to_str().unwrap(), &WordCounter).is_err());
    }

    #[test]
    fn rejects_empty_message_list_entry() {
        let file = write_replay_file("[[]]");
        assert!(ReplayMessageSource::load(file.path().to_str().unwrap(), &WordCounter).is_err());
    }
}
