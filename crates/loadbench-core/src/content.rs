//! Chat-completion message content modeling.
//!
//! The upstream Python implementation treats message `content` as either a
//! bare string or a list of typed parts (duck-typed at call time). This is
//! replaced with an explicit tagged enum so the anti-cache prefix logic and
//! token accounting can dispatch on the shape instead of probing it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Content,
}

impl Content {
    /// Prepend `prefix` to the text content of this message, per the
    /// anti-cache mutation described for `StreamingClient::call`: for list
    /// content, prepend to the first text part, or insert a new text part at
    /// the front if none exists.
    pub fn prepend(&mut self, prefix: &str) {
        match self {
            Content::Text(s) => {
                let mut new_s = String::with_capacity(prefix.len() + s.len());
                new_s.push_str(prefix);
                new_s.push_str(s);
                *s = new_s;
            }
            Content::Parts(parts) => {
                if let Some(Part::Text { text }) =
                    parts.iter_mut().find(|p| matches!(p, Part::Text { .. }))
                {
                    let mut new_text = String::with_capacity(prefix.len() + text.len());
                    new_text.push_str(prefix);
                    new_text.push_str(text);
                    *text = new_text;
                } else {
                    parts.insert(
                        0,
                        Part::Text {
                            text: prefix.trim_end_matches('\n').to_string(),
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_to_text_content() {
        let mut content = Content::Text("hello".to_string());
        content.prepend("ts=1 rand=2\n");
        assert_eq!(content, Content::Text("ts=1 rand=2\nhello".to_string()));
    }

    #[test]
    fn prepend_to_existing_text_part() {
        let mut content = Content::Parts(vec![Part::Text {
            text: "hello".to_string(),
        }]);
        content.prepend("ts=1 rand=2\n");
        match content {
            Content::Parts(parts) => match &parts[0] {
                Part::Text { text } => assert_eq!(text, "ts=1 rand=2\nhello"),
                _ => panic!("expected text part"),
            },
            _ => panic!("expected parts"),
        }
    }

    #[test]
    fn prepend_inserts_new_text_part_when_absent() {
        let mut content = Content::Parts(vec![Part::ImageUrl {
            image_url: ImageUrl {
                url: "https://example.com/img.png".to_string(),
            },
        }]);
        content.prepend("ts=1 rand=2\n");
        match content {
            Content::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                match &parts[0] {
                    Part::Text { text } => assert_eq!(text, "ts=1 rand=2"),
                    _ => panic!("expected inserted text part first"),
                }
            }
            _ => panic!("expected parts"),
        }
    }
}
