//! Tokenizer-only event stream.
//!
//! Adjacent text tokens coalesce into one event, flushed when the next
//! non-text event (or end of input) arrives. Self-closing start tags are
//! followed by a synthetic end event.

use crate::tokenizer::{Token, TokenKind, Tokenizer};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End(String),
    Comment(String),
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

/// Lazily drive the tokenizer over `input`, yielding coalesced events.
pub fn stream(input: &str) -> StreamEvents<'_> {
    StreamEvents {
        tokenizer: Tokenizer::new(input),
        pending_text: String::new(),
        queue: VecDeque::new(),
    }
}

pub struct StreamEvents<'a> {
    tokenizer: Tokenizer<'a>,
    pending_text: String,
    queue: VecDeque<StreamEvent>,
}

impl StreamEvents<'_> {
    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            let text = std::mem::take(&mut self.pending_text);
            self.queue.push_back(StreamEvent::Text(text));
        }
    }
}

impl Iterator for StreamEvents<'_> {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            let Some(Token { kind, .. }) = self.tokenizer.next() else {
                self.flush_text();
                return self.queue.pop_front();
            };
            match kind {
                TokenKind::Text { data } => self.pending_text.push_str(&data),
                TokenKind::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => {
                    self.flush_text();
                    self.queue.push_back(StreamEvent::Start {
                        name: name.clone(),
                        attrs,
                    });
                    if self_closing {
                        self.queue.push_back(StreamEvent::End(name));
                    }
                }
                TokenKind::EndTag { name } => {
                    self.flush_text();
                    self.queue.push_back(StreamEvent::End(name));
                }
                TokenKind::Comment { data } => {
                    self.flush_text();
                    self.queue.push_back(StreamEvent::Comment(data));
                }
                TokenKind::Doctype {
                    name,
                    public_id,
                    system_id,
                } => {
                    self.flush_text();
                    self.queue.push_back(StreamEvent::Doctype {
                        name,
                        public_id,
                        system_id,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<StreamEvent> {
        stream(input).collect()
    }

    #[test]
    fn stream_coalesces_adjacent_text() {
        // "1" and "<2" tokenize separately but stream as one event.
        assert_eq!(
            events("1<2"),
            vec![StreamEvent::Text("1<2".to_string())]
        );
    }

    #[test]
    fn stream_flushes_text_on_next_markup_event() {
        assert_eq!(
            events("a&amp;b<p>c</p>"),
            vec![
                StreamEvent::Text("a&b".to_string()),
                StreamEvent::Start {
                    name: "p".to_string(),
                    attrs: Vec::new(),
                },
                StreamEvent::Text("c".to_string()),
                StreamEvent::End("p".to_string()),
            ]
        );
    }

    #[test]
    fn stream_adds_synthetic_end_for_self_closing_tags() {
        assert_eq!(
            events("<br/>"),
            vec![
                StreamEvent::Start {
                    name: "br".to_string(),
                    attrs: Vec::new(),
                },
                StreamEvent::End("br".to_string()),
            ]
        );
    }

    #[test]
    fn stream_passes_comments_and_doctypes_through() {
        assert_eq!(
            events("<!doctype html><!--x-->"),
            vec![
                StreamEvent::Doctype {
                    name: Some("html".to_string()),
                    public_id: None,
                    system_id: None,
                },
                StreamEvent::Comment("x".to_string()),
            ]
        );
    }

    #[test]
    fn stream_text_matches_parsed_tree_text() {
        let input = "<p>Hello <b>brave</b> world</p>";
        let streamed: String = events(input)
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Text(t) => Some(t),
                _ => None,
            })
            .collect();
        let parsed = crate::parse(input, &crate::ParseOptions::default()).unwrap();
        assert_eq!(
            streamed,
            crate::serialize::to_text(parsed.dom(), parsed.root())
        );
    }
}
