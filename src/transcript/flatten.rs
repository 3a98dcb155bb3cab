//! Flattens a message body into a single plain string.
//!
//! Span lists are concatenated in order with no separator; adjacent spans in
//! the export already carry their own whitespace.  Spans outside the
//! recognized styled-text set contribute nothing.

use super::{MessageText, SpanKind};

/// Span kinds whose content survives flattening.
pub const RECOGNIZED_SPAN_KINDS: &[SpanKind] = &[
    SpanKind::Plain,
    SpanKind::Bold,
    SpanKind::Italic,
    SpanKind::Underline,
    SpanKind::Strikethrough,
    SpanKind::Link,
];

/// Flatten with the default recognized set.  Pure and total.
pub fn flatten(text: &MessageText) -> String {
    flatten_with(text, RECOGNIZED_SPAN_KINDS)
}

/// Flatten keeping only spans whose kind appears in `recognized`.
pub fn flatten_with(text: &MessageText, recognized: &[SpanKind]) -> String {
    match text {
        MessageText::Plain(s) => s.clone(),
        MessageText::Spans(spans) => spans
            .iter()
            .filter(|span| recognized.contains(&span.kind))
            .map(|span| span.content.as_str())
            .collect(),
    }
}
