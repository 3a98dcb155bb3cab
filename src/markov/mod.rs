//! Order-k Markov chain over a sentence corpus.
//!
//! Training tokenizes the corpus on whitespace, brackets every sentence with
//! k synthetic begin markers and one end marker, and counts each observed
//! state-to-token transition.  Generation is bounded-retry rejection
//! sampling: whole candidate sentences are produced and discarded until one
//! fits the length bound or the try budget runs out.  Truncation is never
//! used, so an emitted sentence is always complete.

use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::corpus::normalize::TERMINAL_CHARS;

/// Default chain order (state size).
pub const DEFAULT_ORDER: usize = 2;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("corpus contains no usable sentences")]
    InsufficientCorpus,
    #[error("no sentence within the length bound after {tries} tries")]
    GenerationFailed { tries: usize },
}

/// Chain token: a corpus word or one of the synthetic sentence markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Begin,
    Word(String),
    End,
}

/// Knobs for one generation run.  All bounds are explicit caller-visible
/// parameters; there is no hidden timeout.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    /// Maximum rendered sentence length, in characters.
    pub max_length: usize,

    /// Retry budget: candidates produced before giving up.
    pub max_tries: usize,

    /// Runaway guard: a single attempt is abandoned once it exceeds this
    /// many words without reaching the end marker.
    pub max_tokens: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_length: 140,
            max_tries: 1000,
            max_tokens: 500,
        }
    }
}

/// Immutable once trained; rebuilt from scratch for every generation run.
#[derive(Debug)]
pub struct SentenceModel {
    order: usize,
    transitions: HashMap<Vec<Token>, Vec<(Token, u32)>>,
}

impl SentenceModel {
    /// Train an order-`order` chain on serialized corpus text.
    ///
    /// Sentences are delimited by tokens ending in terminal punctuation; a
    /// trailing unpunctuated run still counts as a sentence, since the
    /// splitter may legitimately emit one.
    pub fn train(corpus: &str, order: usize) -> Result<Self, ModelError> {
        let mut sentences: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for word in corpus.split_whitespace() {
            let closes = word.ends_with(TERMINAL_CHARS);
            current.push(word.to_string());
            if closes {
                sentences.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            sentences.push(current);
        }
        if sentences.is_empty() {
            return Err(ModelError::InsufficientCorpus);
        }

        let mut counts: HashMap<Vec<Token>, HashMap<Token, u32>> = HashMap::new();
        for sentence in &sentences {
            let mut state: Vec<Token> = vec![Token::Begin; order];
            let bracketed = sentence
                .iter()
                .map(|w| Token::Word(w.clone()))
                .chain(std::iter::once(Token::End));
            for token in bracketed {
                *counts
                    .entry(state.clone())
                    .or_default()
                    .entry(token.clone())
                    .or_insert(0) += 1;
                state.remove(0);
                state.push(token);
            }
        }

        let transitions: HashMap<Vec<Token>, Vec<(Token, u32)>> = counts
            .into_iter()
            .map(|(state, outcomes)| (state, outcomes.into_iter().collect()))
            .collect();

        debug!(
            order,
            sentences = sentences.len(),
            states = transitions.len(),
            "trained sentence model"
        );
        Ok(Self { order, transitions })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Produce one new sentence within `opts.max_length` characters.
    ///
    /// Repeats up to `opts.max_tries` times and returns the first candidate
    /// that fits; candidates are never truncated.  The random source is
    /// injected so callers can generate deterministically.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        opts: &GenerateOptions,
        rng: &mut R,
    ) -> Result<String, ModelError> {
        for _ in 0..opts.max_tries {
            let Some(sentence) = self.attempt(opts.max_tokens, rng) else {
                continue;
            };
            if sentence.chars().count() <= opts.max_length {
                return Ok(sentence);
            }
        }
        Err(ModelError::GenerationFailed {
            tries: opts.max_tries,
        })
    }

    /// Walk the chain from the begin state until the end marker, sampling
    /// each next token from the state's weighted outcome multiset.  Returns
    /// `None` when the attempt hits a dead end or the runaway guard.
    fn attempt<R: Rng + ?Sized>(&self, max_tokens: usize, rng: &mut R) -> Option<String> {
        let mut state: Vec<Token> = vec![Token::Begin; self.order];
        let mut words: Vec<&str> = Vec::new();
        loop {
            let outcomes = self.transitions.get(&state)?;
            let (next, _) = outcomes.choose_weighted(rng, |(_, count)| *count).ok()?;
            match next {
                Token::End => return Some(words.join(" ")),
                Token::Word(word) => {
                    words.push(word);
                    if words.len() > max_tokens {
                        return None;
                    }
                    state.remove(0);
                    state.push(next.clone());
                }
                // Begin is never recorded as an outcome.
                Token::Begin => return None,
            }
        }
    }
}
