//! chatkov - turns an exported chat transcript into a per-user sentence
//! corpus and trains a Markov chain over it to synthesize new sentences.
//!
//! The pipeline has three stages:
//! - Transcript model: typed view of the export (chat metadata + messages)
//! - Corpus builder: flatten, normalize and sentence-split one user's messages
//! - Sentence model: order-k Markov chain with bounded-retry generation

pub mod corpus;
pub mod markov;
pub mod transcript;
