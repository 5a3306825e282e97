//! # Vocabulary Builder
//!
//! Induces a [`Vocab`] from corpus frequency counts.
//!
//! Ordering is deterministic: tokens are ranked by frequency descending,
//! with ties broken by first-seen corpus order. The reserved tokens always
//! occupy their fixed slots ahead of any counted token.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::corpus::{for_each_instance, tokenize_text};
use crate::errors::CcResult;
use crate::types::{PAD_TOK, UNK_TOK};
use crate::vocab::io::save_vocab_path;
use crate::vocab::token_vocab::Vocab;

/// A frequency count over observed tokens.
///
/// Tracks the order in which tokens were first seen, so the size cutoff
/// in [`VocabBuilderOptions::build`] has a stable tie-break.
#[derive(Debug, Clone, Default)]
pub struct VocabCounter {
    counts: HashMap<String, TokenStats>,
    next_rank: usize,
}

#[derive(Debug, Clone, Copy)]
struct TokenStats {
    count: u64,
    first_seen: usize,
}

impl VocabCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Default::default()
    }

    /// Count one token occurrence.
    pub fn update(
        &mut self,
        token: &str,
    ) {
        match self.counts.get_mut(token) {
            Some(stats) => stats.count += 1,
            None => {
                let stats = TokenStats {
                    count: 1,
                    first_seen: self.next_rank,
                };
                self.counts.insert(token.to_string(), stats);
                self.next_rank += 1;
            }
        }
    }

    /// The corpus frequency of a token.
    pub fn count(
        &self,
        token: &str,
    ) -> u64 {
        self.counts.get(token).map_or(0, |stats| stats.count)
    }

    /// The number of distinct tokens observed.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }
}

/// Options for building a [`Vocab`] from a [`VocabCounter`].
#[derive(Debug, Clone, Default)]
pub struct VocabBuilderOptions {
    /// Max number of non-reserved entries; None is unbounded.
    pub max_size: Option<usize>,

    /// Minimum corpus frequency for inclusion.
    pub min_freq: u64,

    /// If set, the built vocabulary is serialized to this path.
    pub save_path: Option<PathBuf>,
}

impl VocabBuilderOptions {
    /// Create options with no size cap and a minimum frequency of 1.
    pub fn new() -> Self {
        Self {
            max_size: None,
            min_freq: 1,
            save_path: None,
        }
    }

    /// Sets the max vocab size (non-reserved entries).
    pub fn with_max_size(
        self,
        max_size: usize,
    ) -> Self {
        Self {
            max_size: Some(max_size),
            ..self
        }
    }

    /// Sets the minimum corpus frequency.
    pub fn with_min_freq(
        self,
        min_freq: u64,
    ) -> Self {
        Self { min_freq, ..self }
    }

    /// Sets the save path.
    pub fn with_save_path<P: Into<PathBuf>>(
        self,
        path: P,
    ) -> Self {
        Self {
            save_path: Some(path.into()),
            ..self
        }
    }

    /// Build a [`Vocab`] from a frequency count.
    ///
    /// Reserved tokens come first; counted tokens follow in frequency
    /// order (descending), ties by first-seen order; tokens below
    /// `min_freq` are excluded; at most `max_size` counted tokens
    /// are kept.
    pub fn build(
        &self,
        counter: &VocabCounter,
    ) -> Vocab {
        let mut ranked: Vec<(&str, TokenStats)> = counter
            .counts
            .iter()
            .filter(|(token, stats)| {
                stats.count >= self.min_freq
                    && token.as_str() != UNK_TOK
                    && token.as_str() != PAD_TOK
            })
            .map(|(token, stats)| (token.as_str(), *stats))
            .collect();

        ranked.sort_by_key(|(_, stats)| (core::cmp::Reverse(stats.count), stats.first_seen));

        if let Some(max_size) = self.max_size {
            ranked.truncate(max_size);
        }

        let mut itos = Vec::with_capacity(2 + ranked.len());
        itos.push(UNK_TOK.to_string());
        itos.push(PAD_TOK.to_string());
        itos.extend(ranked.into_iter().map(|(token, _)| token.to_string()));

        Vocab::from_itos(itos)
    }

    /// Build a [`Vocab`] from a count, saving it if a save path is set.
    fn build_and_save(
        &self,
        counter: &VocabCounter,
    ) -> CcResult<Vocab> {
        let vocab = self.build(counter);
        if let Some(path) = &self.save_path {
            save_vocab_path(&vocab, path)?;
            log::info!(
                "Saved vocabulary ({} entries) to {}",
                vocab.len(),
                path.display()
            );
        }
        Ok(vocab)
    }
}

/// Build an event vocabulary from the `e1` field of a JSONL corpus.
///
/// ## Arguments
/// * `path` - the corpus path.
/// * `options` - size/frequency thresholds and an optional save path.
///
/// ## Returns
/// The built vocabulary; also serialized when a save path is set.
pub fn build_event_vocab<P: AsRef<Path>>(
    path: P,
    options: &VocabBuilderOptions,
) -> CcResult<Vocab> {
    let mut counter = VocabCounter::new();
    for_each_instance(path, |record| {
        counter.update(&record.e1);
    })?;

    log::info!("Counted {} distinct events", counter.distinct());
    options.build_and_save(&counter)
}

/// Build a text vocabulary from the lower-cased, whitespace-tokenized
/// `e1_text` field of a JSONL corpus.
pub fn build_text_vocab<P: AsRef<Path>>(
    path: P,
    options: &VocabBuilderOptions,
) -> CcResult<Vocab> {
    let mut counter = VocabCounter::new();
    for_each_instance(path, |record| {
        for token in tokenize_text(&record.e1_text) {
            counter.update(&token);
        }
    })?;

    log::info!("Counted {} distinct text tokens", counter.distinct());
    options.build_and_save(&counter)
}
