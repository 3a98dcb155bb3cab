//! Typed model of an exported chat transcript.
//!
//! The export format is a single JSON document with chat metadata and an
//! ordered `messages` array.  A message's `text` field is either a plain
//! string or a list of styled spans; both shapes are resolved into an
//! explicit [`MessageText`] variant at load time so downstream code never
//! inspects raw JSON.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod flatten;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript file not found: {path}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read transcript {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed transcript: {0}")]
    Malformed(String),
}

/// Chat metadata plus two diagnostic sets collected during the load pass.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: i64,
    pub name: String,

    /// Every message `type` tag observed in the export.
    pub message_types: BTreeSet<String>,

    /// Span kinds seen in rich-text messages that are not part of the
    /// recognized styled-text set.  Reported by the CLI, never extracted.
    pub message_text_span_types: BTreeSet<String>,
}

/// Message kind tag.  Only `Message` entries are eligible for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Message,
    Service,
    Other,
}

impl MessageKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "message" => MessageKind::Message,
            "service" => MessageKind::Service,
            _ => MessageKind::Other,
        }
    }
}

/// One styled or unstyled run of text within a rich-text message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub kind: SpanKind,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Link,
    Other,
}

impl SpanKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "plain" => SpanKind::Plain,
            "bold" => SpanKind::Bold,
            "italic" => SpanKind::Italic,
            "underline" => SpanKind::Underline,
            "strikethrough" => SpanKind::Strikethrough,
            "link" => SpanKind::Link,
            _ => SpanKind::Other,
        }
    }
}

/// A message body: the export stores either a bare string or a span list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageText {
    Plain(String),
    Spans(Vec<TextSpan>),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub kind: MessageKind,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub text: MessageText,
}

// Raw serde mirror of the export format.  Kept private; `load` converts it
// into the public model in a single pass.

#[derive(Deserialize)]
struct RawTranscript {
    name: String,
    id: i64,
    messages: Vec<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_id: Option<RawAuthorId>,
    #[serde(default)]
    text: RawText,
}

/// `from_id` appears as a string in newer exports and a number in older ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAuthorId {
    Text(String),
    Number(i64),
}

impl RawAuthorId {
    fn into_string(self) -> String {
        match self {
            RawAuthorId::Text(s) => s,
            RawAuthorId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Plain(String),
    Spans(Vec<RawSpan>),
}

impl Default for RawText {
    fn default() -> Self {
        RawText::Plain(String::new())
    }
}

/// Span list entries are bare strings (plain runs) or typed records.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpan {
    Plain(String),
    Styled {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        text: String,
    },
}

/// Parse a transcript export from a JSON string.
///
/// Computes the diagnostic `message_types` and `message_text_span_types`
/// sets as a byproduct of the same pass.
pub fn load(json: &str) -> Result<(Chat, Vec<Message>), TranscriptError> {
    let raw: RawTranscript =
        serde_json::from_str(json).map_err(|e| TranscriptError::Malformed(e.to_string()))?;

    let mut message_types = BTreeSet::new();
    let mut unrecognized_spans = BTreeSet::new();
    let mut messages = Vec::with_capacity(raw.messages.len());

    for raw_message in raw.messages {
        message_types.insert(raw_message.kind.clone());

        let text = match raw_message.text {
            RawText::Plain(s) => MessageText::Plain(s),
            RawText::Spans(spans) => MessageText::Spans(
                spans
                    .into_iter()
                    .map(|span| match span {
                        RawSpan::Plain(content) => TextSpan {
                            kind: SpanKind::Plain,
                            content,
                        },
                        RawSpan::Styled { kind, text } => {
                            let span_kind = SpanKind::from_tag(&kind);
                            if span_kind == SpanKind::Other {
                                unrecognized_spans.insert(kind);
                            }
                            TextSpan {
                                kind: span_kind,
                                content: text,
                            }
                        }
                    })
                    .collect(),
            ),
        };

        messages.push(Message {
            id: raw_message.id,
            kind: MessageKind::from_tag(&raw_message.kind),
            author_id: raw_message.from_id.map(RawAuthorId::into_string),
            author_name: raw_message.from,
            text,
        });
    }

    debug!(
        chat = %raw.name,
        messages = messages.len(),
        "loaded transcript"
    );

    let chat = Chat {
        id: raw.id,
        name: raw.name,
        message_types,
        message_text_span_types: unrecognized_spans,
    };
    Ok((chat, messages))
}

/// Read and parse a transcript export from disk.
pub fn load_from_path(path: &Path) -> Result<(Chat, Vec<Message>), TranscriptError> {
    let json = fs::read_to_string(path).map_err(|e| {
        let path = path.display().to_string();
        if e.kind() == std::io::ErrorKind::NotFound {
            TranscriptError::NotFound { path, source: e }
        } else {
            TranscriptError::Io { path, source: e }
        }
    })?;
    load(&json)
}

/// Author id to most recently observed display name, in first-seen order.
///
/// Rebuilt per load; only `kind == message` entries contribute.
#[derive(Debug, Default)]
pub struct UserIndex {
    entries: Vec<(String, String)>,
}

impl UserIndex {
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for message in messages {
            if message.kind != MessageKind::Message {
                continue;
            }
            let Some(id) = &message.author_id else {
                continue;
            };
            let name = message
                .author_name
                .clone()
                .unwrap_or_else(|| "<unknown>".to_string());
            match entries.iter().position(|(known, _)| known == id) {
                Some(i) => entries[i].1 = name,
                None => entries.push((id.clone(), name)),
            }
        }
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "name": "Weekend plans",
        "id": 777000,
        "messages": [
            {"id": 1, "type": "message", "from": "Ann", "from_id": "user100", "text": "Hello there!"},
            {"id": 2, "type": "service", "from": "Ann", "from_id": "user100", "text": ""},
            {"id": 3, "type": "message", "from": "Bob", "from_id": 200,
             "text": ["plain start ", {"type": "bold", "text": "bold middle"}, {"type": "custom_emoji", "text": "x"}]},
            {"id": 4, "type": "message", "from": "Annie", "from_id": "user100", "text": "Bye."}
        ]
    }"#;

    #[test]
    fn loads_chat_metadata() {
        let (chat, messages) = load(EXPORT).unwrap();
        assert_eq!(chat.name, "Weekend plans");
        assert_eq!(chat.id, 777000);
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn collects_diagnostic_sets() {
        let (chat, _) = load(EXPORT).unwrap();
        assert!(chat.message_types.contains("message"));
        assert!(chat.message_types.contains("service"));
        assert!(chat.message_text_span_types.contains("custom_emoji"));
        // Recognized kinds never land in the diagnostic set.
        assert!(!chat.message_text_span_types.contains("bold"));
    }

    #[test]
    fn resolves_text_variants() {
        let (_, messages) = load(EXPORT).unwrap();
        assert_eq!(messages[0].text, MessageText::Plain("Hello there!".to_string()));
        match &messages[2].text {
            MessageText::Spans(spans) => {
                assert_eq!(spans.len(), 3);
                assert_eq!(spans[0].kind, SpanKind::Plain);
                assert_eq!(spans[1].kind, SpanKind::Bold);
                assert_eq!(spans[2].kind, SpanKind::Other);
            }
            other => panic!("expected spans, got {:?}", other),
        }
    }

    #[test]
    fn numeric_author_id_is_normalized() {
        let (_, messages) = load(EXPORT).unwrap();
        assert_eq!(messages[2].author_id.as_deref(), Some("200"));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = load(r#"{"name": "x", "id": 1}"#).unwrap_err();
        assert!(matches!(err, TranscriptError::Malformed(_)));
    }

    #[test]
    fn non_object_input_is_malformed() {
        let err = load("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, TranscriptError::Malformed(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_from_path(Path::new("/nonexistent/export.json")).unwrap_err();
        assert!(matches!(err, TranscriptError::NotFound { .. }));
    }

    #[test]
    fn user_index_keeps_first_seen_order_and_latest_name() {
        let (_, messages) = load(EXPORT).unwrap();
        let index = UserIndex::from_messages(&messages);
        let users: Vec<_> = index.iter().collect();
        // user100 renamed Ann -> Annie; position stays first.
        assert_eq!(users, vec![("user100", "Annie"), ("200", "Bob")]);
    }

    #[test]
    fn user_index_skips_service_messages() {
        let json = r#"{
            "name": "c", "id": 1,
            "messages": [{"id": 1, "type": "service", "from": "S", "from_id": "s1", "text": ""}]
        }"#;
        let (_, messages) = load(json).unwrap();
        assert!(UserIndex::from_messages(&messages).is_empty());
    }
}
