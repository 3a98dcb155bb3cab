//! Per-user corpus extraction and persistence.
//!
//! A corpus is the ordered list of normalized sentences extracted from one
//! author's messages.  Serialized form is a single token stream: each
//! sentence followed by one space, no newlines and no metadata, ready for
//! the sentence model's whitespace tokenizer.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::transcript::flatten::flatten;
use crate::transcript::{Message, MessageKind};

pub mod normalize;

use normalize::SentenceSplitter;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to write corpus to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered sentences belonging to one author.  Append-only during a run.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    sentences: Vec<String>,
}

impl Corpus {
    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Render the corpus as one continuous token stream: every sentence
    /// followed by a single space.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for sentence in &self.sentences {
            out.push_str(sentence);
            out.push(' ');
        }
        out
    }

    /// Persist the corpus atomically: the content is written to a temporary
    /// file in the destination directory and renamed into place, so a failed
    /// run never leaves a partial artifact at `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), CorpusError> {
        let write_err = |source: std::io::Error| CorpusError::Write {
            path: path.display().to_string(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.serialize().as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), sentences = self.sentences.len(), "corpus written");
        Ok(())
    }
}

/// Build the corpus for one author: filter to ordinary messages from
/// `author_id`, flatten each body, and sentence-split it.  Message order and
/// in-message sentence order are preserved.
///
/// An author with no matching messages yields an empty corpus, not an error;
/// the caller decides whether that is worth reporting.
pub fn extract_user_sentences(
    messages: &[Message],
    author_id: &str,
    splitter: &SentenceSplitter,
) -> Corpus {
    let mut sentences = Vec::new();
    let mut matched = 0usize;

    for message in messages {
        if message.kind != MessageKind::Message {
            continue;
        }
        if message.author_id.as_deref() != Some(author_id) {
            continue;
        }
        matched += 1;
        let flat = flatten(&message.text);
        sentences.extend(splitter.split(&flat));
    }

    debug!(author_id, matched, sentences = sentences.len(), "extracted corpus");
    Corpus { sentences }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{MessageText, SpanKind, TextSpan, load};

    fn fixture() -> Vec<Message> {
        let json = r#"{
            "name": "c", "id": 1,
            "messages": [
                {"id": 1, "type": "message", "from": "Ann", "from_id": "user1",
                 "text": "Hello there! How are you?\nFine, thanks."},
                {"id": 2, "type": "service", "from": "Ann", "from_id": "user1", "text": "Joined."},
                {"id": 3, "type": "message", "from": "Bob", "from_id": "user2", "text": "Not me."},
                {"id": 4, "type": "message", "from": "Ann", "from_id": "user1",
                 "text": [{"type": "bold", "text": "Go "}, {"type": "custom_emoji", "text": "x"}, "now."]},
                {"id": 5, "type": "message", "from": "Ann", "from_id": "user1", "text": "   "}
            ]
        }"#;
        load(json).unwrap().1
    }

    #[test]
    fn extracts_in_message_order() {
        let corpus = extract_user_sentences(&fixture(), "user1", &SentenceSplitter::default());
        assert_eq!(
            corpus.sentences(),
            ["Hello there!", "How are you?", "Fine, thanks.", "Go now."]
        );
    }

    #[test]
    fn service_messages_and_other_authors_are_skipped() {
        let corpus = extract_user_sentences(&fixture(), "user2", &SentenceSplitter::default());
        assert_eq!(corpus.sentences(), ["Not me."]);
    }

    #[test]
    fn unknown_author_yields_empty_corpus() {
        let corpus = extract_user_sentences(&fixture(), "user42", &SentenceSplitter::default());
        assert!(corpus.is_empty());
    }

    #[test]
    fn whitespace_only_message_contributes_nothing() {
        let messages = vec![Message {
            id: 1,
            kind: MessageKind::Message,
            author_id: Some("u".to_string()),
            author_name: None,
            text: MessageText::Plain("  \n  ".to_string()),
        }];
        let corpus = extract_user_sentences(&messages, "u", &SentenceSplitter::default());
        assert!(corpus.is_empty());
    }

    #[test]
    fn span_message_is_flattened_before_splitting() {
        let messages = vec![Message {
            id: 1,
            kind: MessageKind::Message,
            author_id: Some("u".to_string()),
            author_name: None,
            text: MessageText::Spans(vec![
                TextSpan { kind: SpanKind::Bold, content: "Go ".to_string() },
                TextSpan { kind: SpanKind::Other, content: "ignored".to_string() },
                TextSpan { kind: SpanKind::Plain, content: "now.".to_string() },
            ]),
        }];
        let corpus = extract_user_sentences(&messages, "u", &SentenceSplitter::default());
        assert_eq!(corpus.sentences(), ["Go now."]);
    }

    #[test]
    fn serialize_appends_one_space_per_sentence() {
        let corpus = extract_user_sentences(&fixture(), "user2", &SentenceSplitter::default());
        assert_eq!(corpus.serialize(), "Not me. ");
    }

    #[test]
    fn resplitting_serialized_corpus_preserves_sentence_count() {
        let splitter = SentenceSplitter::default();
        let corpus = extract_user_sentences(&fixture(), "user1", &splitter);
        let resplit = splitter.split(&corpus.serialize());
        assert_eq!(resplit.len(), corpus.len());
        assert_eq!(resplit, corpus.sentences());
    }

    #[test]
    fn write_to_creates_the_file_with_serialized_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        let corpus = extract_user_sentences(&fixture(), "user1", &SentenceSplitter::default());
        corpus.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), corpus.serialize());
    }

    #[test]
    fn write_to_missing_directory_fails_without_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("corpus.txt");
        let corpus = extract_user_sentences(&fixture(), "user1", &SentenceSplitter::default());
        assert!(matches!(corpus.write_to(&path), Err(CorpusError::Write { .. })));
        assert!(!path.exists());
    }
}
