//! Command-line launcher for the chatkov pipeline.
//!
//! `import` reads a chat export, optionally prints chat info and the user
//! list, and builds a per-user sentence corpus.  `generate` trains a Markov
//! chain on a corpus file and prints new sentences.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chatkov::corpus::normalize::SentenceSplitter;
use chatkov::corpus::extract_user_sentences;
use chatkov::markov::{DEFAULT_ORDER, GenerateOptions, ModelError, SentenceModel};
use chatkov::transcript::{UserIndex, load_from_path};

#[derive(Parser)]
#[command(name = "chatkov", version, about = "Chat transcript corpus builder and sentence generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a chat export and build a per-user sentence corpus
    Import {
        /// Path to the exported transcript JSON
        input: PathBuf,

        /// Print chat info
        #[arg(short = 'i', long)]
        info: bool,

        /// Print the user list
        #[arg(short = 'l', long)]
        users: bool,

        /// Author id to build a corpus for
        #[arg(short = 'u', long)]
        user: Option<String>,

        /// Corpus output path (default: "<input stem>_<user id>.txt" next to the input)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Generate sentences from a previously built corpus
    Generate {
        /// Path to a corpus file written by `import`
        corpus: PathBuf,

        /// Number of sentences to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        sentences: usize,

        /// Maximum sentence length in characters
        #[arg(short = 'l', long, default_value_t = 140)]
        max_length: usize,

        /// Retry budget per sentence
        #[arg(long, default_value_t = 1000)]
        tries: usize,

        /// Seed for deterministic generation
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Command::Import {
            input,
            info,
            users,
            user,
            output,
        } => import(&input, info, users, user.as_deref(), output.as_deref()),
        Command::Generate {
            corpus,
            sentences,
            max_length,
            tries,
            seed,
        } => generate(&corpus, sentences, max_length, tries, seed),
    }
}

fn import(
    input: &Path,
    info: bool,
    users: bool,
    user: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let (chat, messages) = load_from_path(input)?;

    if info {
        println!("Chat: {} ({})", chat.name, chat.id);
        println!("Messages: {}", messages.len());
        if !chat.message_types.is_empty() {
            let types: Vec<&str> = chat.message_types.iter().map(String::as_str).collect();
            println!("Message types: {}", types.join(", "));
        }
        if !chat.message_text_span_types.is_empty() {
            let kinds: Vec<&str> = chat
                .message_text_span_types
                .iter()
                .map(String::as_str)
                .collect();
            println!("Unrecognized span kinds: {}", kinds.join(", "));
        }
    }

    if users {
        println!("Users:");
        for (n, (id, name)) in UserIndex::from_messages(&messages).iter().enumerate() {
            println!("{}. {} ({})", n + 1, name, id);
        }
    }

    if let Some(user) = user {
        let corpus = extract_user_sentences(&messages, user, &SentenceSplitter::default());
        if corpus.is_empty() {
            println!("No messages found for user \"{user}\"");
            return Ok(());
        }

        let path = match output {
            Some(path) => path.to_path_buf(),
            None => default_corpus_path(input, user),
        };
        corpus.write_to(&path)?;
        println!("Wrote {} sentences to {}", corpus.len(), path.display());
    }

    Ok(())
}

fn default_corpus_path(input: &Path, user: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("corpus");
    input.with_file_name(format!("{stem}_{user}.txt"))
}

fn generate(
    corpus: &Path,
    sentences: usize,
    max_length: usize,
    tries: usize,
    seed: Option<u64>,
) -> Result<()> {
    let text = fs::read_to_string(corpus)
        .with_context(|| format!("failed to read corpus {}", corpus.display()))?;
    let model = SentenceModel::train(&text, DEFAULT_ORDER)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let opts = GenerateOptions {
        max_length,
        max_tries: tries,
        ..GenerateOptions::default()
    };

    let produced = run_batch(
        &model,
        &opts,
        &mut rng,
        sentences,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )?;

    if produced == 0 && sentences > 0 {
        bail!("no sentence fit within {max_length} characters after {tries} tries each");
    }
    Ok(())
}

/// Request `count` sentences, printing each success to `out`.  A sentence
/// that exhausts its retry budget is reported on `errs` and skipped; the
/// batch keeps going.  Returns how many sentences were produced.
fn run_batch<R: Rng + ?Sized>(
    model: &SentenceModel,
    opts: &GenerateOptions,
    rng: &mut R,
    count: usize,
    out: &mut impl Write,
    errs: &mut impl Write,
) -> Result<usize> {
    let mut produced = 0usize;
    for _ in 0..count {
        match model.generate(opts, rng) {
            Ok(sentence) => {
                writeln!(out, "{sentence}")?;
                produced += 1;
            }
            Err(err @ ModelError::GenerationFailed { .. }) => {
                writeln!(errs, "{err}")?;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    #[test]
    fn run_batch_prints_successes_to_out() {
        let model = SentenceModel::train("Short one. ", DEFAULT_ORDER).unwrap();
        let (mut out, mut errs) = (Vec::new(), Vec::new());
        let produced = run_batch(
            &model,
            &GenerateOptions::default(),
            &mut seeded(),
            2,
            &mut out,
            &mut errs,
        )
        .unwrap();
        assert_eq!(produced, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "Short one.\nShort one.\n");
        assert!(errs.is_empty());
    }

    #[test]
    fn run_batch_reports_each_failed_sentence_on_errs() {
        // Every request fails under an impossible length bound, and every
        // failure must be visible to the caller, not silently skipped.
        let model = SentenceModel::train("This sentence cannot fit. ", DEFAULT_ORDER).unwrap();
        let opts = GenerateOptions {
            max_length: 3,
            max_tries: 10,
            ..GenerateOptions::default()
        };
        let (mut out, mut errs) = (Vec::new(), Vec::new());
        let produced = run_batch(&model, &opts, &mut seeded(), 2, &mut out, &mut errs).unwrap();
        assert_eq!(produced, 0);
        assert!(out.is_empty());
        let report = String::from_utf8(errs).unwrap();
        assert_eq!(report.lines().count(), 2);
        assert!(report.contains("no sentence within the length bound after 10 tries"));
    }
}
