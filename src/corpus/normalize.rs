//! Whitespace normalization and sentence splitting.
//!
//! Splitting runs one refinement round per terminal character: every current
//! fragment is split on that character, each piece is re-normalized, and the
//! round's character is reattached to the pieces it closed.  Processing one
//! separator kind at a time is what lets the correct punctuation mark end up
//! on the correct fragment.

/// Sentence-terminal characters, in refinement-round order.
pub const TERMINAL_CHARS: &[char] = &['.', '?', '!'];

/// Configurable normalizer and sentence splitter.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    /// Characters that close a sentence, processed one round each in order.
    pub terminals: Vec<char>,

    /// Literal substrings protected from splitting.  Each is rewritten to a
    /// placeholder with its terminal characters stripped ("e.g." -> "eg").
    /// The substitution is directional: output sentences keep the
    /// placeholder form.
    pub abbreviations: Vec<String>,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self {
            terminals: TERMINAL_CHARS.to_vec(),
            abbreviations: ["e.g.", "i.e.", "etc."].map(String::from).to_vec(),
        }
    }
}

impl SentenceSplitter {
    fn placeholder(&self, abbreviation: &str) -> String {
        abbreviation
            .chars()
            .filter(|c| !self.terminals.contains(c))
            .collect()
    }

    /// Clean up a raw string: trim, join line breaks, collapse interior
    /// whitespace, and substitute protected abbreviations.  Returns `None`
    /// when nothing but whitespace remains.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        let mut joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        for abbreviation in &self.abbreviations {
            if joined.contains(abbreviation.as_str()) {
                joined = joined.replace(abbreviation.as_str(), &self.placeholder(abbreviation));
            }
        }
        Some(joined)
    }

    /// Split a message into terminal-punctuated sentences, preserving
    /// left-to-right order.
    ///
    /// When a fragment is split on terminal `c`, every piece except the last
    /// regains `c` (unless it already ends with a terminal character).  The
    /// last piece had no `c` after it and is carried into the next round
    /// unchanged; a fragment with no terminal character at all survives all
    /// rounds unpunctuated and is still emitted.
    pub fn split(&self, raw: &str) -> Vec<String> {
        // Protect abbreviations before any terminal round runs; otherwise
        // the '.' round would tear a literal like "e.g." apart before the
        // placeholder substitution could apply.
        let Some(initial) = self.normalize(raw) else {
            return Vec::new();
        };
        let mut fragments = vec![initial];
        for &terminal in &self.terminals {
            let mut refined = Vec::new();
            for fragment in &fragments {
                let pieces: Vec<&str> = fragment.split(terminal).collect();
                let last = pieces.len() - 1;
                for (i, piece) in pieces.iter().enumerate() {
                    let Some(mut cleaned) = self.normalize(piece) else {
                        continue;
                    };
                    let closed = cleaned
                        .chars()
                        .last()
                        .is_some_and(|c| self.terminals.contains(&c));
                    if i < last && !closed {
                        cleaned.push(terminal);
                    }
                    refined.push(cleaned);
                }
            }
            fragments = refined;
        }
        fragments
    }
}
