//! # Instance Dataset
//!
//! Turns raw corpus records into numericalized training instances.
//!
//! The dataset is constructed once per run and is immutable afterward.
//! Vocabularies are injected at construction; the dataset never mutates
//! or re-derives them.

use std::path::Path;

use crate::corpus::{RawInstance, read_instances, tokenize_text};
use crate::errors::CcResult;
use crate::types::TokenId;
use crate::vocab::Vocab;

/// One numericalized training instance.
///
/// Sequence fields are unpadded here; padding is a batch-assembly
/// concern (see [`batch`](crate::batch)). The true lengths are the
/// vector lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Text-token ids for the current event's textual span.
    pub e1_text: Vec<TokenId>,

    /// The current event id.
    pub e1: TokenId,

    /// The next event id; the prediction target.
    pub e2: TokenId,

    /// Ids of prior in-context events, in document order.
    pub e1prev_intext: Vec<TokenId>,
}

impl Instance {
    /// The true (pre-pad) text length.
    pub fn text_len(&self) -> usize {
        self.e1_text.len()
    }

    /// The true (pre-pad) context-event count.
    pub fn context_len(&self) -> usize {
        self.e1prev_intext.len()
    }
}

/// Options for [`InstanceDataset`] construction.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Minimum width for the text field after batch padding; the floor
    /// is the largest receptive-field size among components that
    /// convolve over the sequence.
    pub min_text_width: usize,

    /// Drop instances whose `e1` or `e2` is out of the event vocabulary.
    pub filter_unk_events: bool,

    /// Drop out-of-vocabulary entries from `e1prev_intext`.
    ///
    /// Off by default: the original pipeline left this disabled as a
    /// performance trade-off, keeping unknown ids in the context bag.
    pub filter_unk_context: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            min_text_width: 5,
            filter_unk_events: true,
            filter_unk_context: false,
        }
    }
}

impl DatasetOptions {
    /// Create default options.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the minimum text width.
    pub fn with_min_text_width(
        self,
        min_text_width: usize,
    ) -> Self {
        Self {
            min_text_width,
            ..self
        }
    }

    /// Sets whether unknown-event instances are dropped.
    pub fn with_filter_unk_events(
        self,
        filter_unk_events: bool,
    ) -> Self {
        Self {
            filter_unk_events,
            ..self
        }
    }

    /// Sets whether unknown context events are dropped.
    pub fn with_filter_unk_context(
        self,
        filter_unk_context: bool,
    ) -> Self {
        Self {
            filter_unk_context,
            ..self
        }
    }
}

/// An ordered, immutable collection of numericalized instances.
#[derive(Debug, Clone)]
pub struct InstanceDataset {
    instances: Vec<Instance>,
    min_text_width: usize,
}

impl InstanceDataset {
    /// Load and numericalize a JSONL corpus.
    ///
    /// ## Arguments
    /// * `path` - the corpus path.
    /// * `event_vocab` - vocabulary for `e1`/`e2`/`e1prev_intext`.
    /// * `text_vocab` - vocabulary for `e1_text` tokens.
    /// * `options` - filtering policy and the minimum text width.
    ///
    /// ## Returns
    /// The dataset, in corpus order (minus filtered instances).
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        event_vocab: &Vocab,
        text_vocab: &Vocab,
        options: &DatasetOptions,
    ) -> CcResult<Self> {
        let records = read_instances(path)?;
        Ok(Self::from_records(
            &records,
            event_vocab,
            text_vocab,
            options,
        ))
    }

    /// Numericalize pre-parsed records.
    ///
    /// The fast path for cached corpora; behaviorally identical to
    /// [`Self::from_path`] on the same records.
    pub fn from_records(
        records: &[RawInstance],
        event_vocab: &Vocab,
        text_vocab: &Vocab,
        options: &DatasetOptions,
    ) -> Self {
        let mut instances = Vec::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            if options.filter_unk_events
                && !(event_vocab.contains(&record.e1) && event_vocab.contains(&record.e2))
            {
                dropped += 1;
                continue;
            }

            let e1_text = text_vocab.numericalize(&tokenize_text(&record.e1_text));

            let e1prev_intext = if options.filter_unk_context {
                record
                    .e1prev_intext
                    .iter()
                    .filter(|event| event_vocab.contains(event))
                    .map(|event| event_vocab.lookup(event))
                    .collect()
            } else {
                event_vocab.numericalize(&record.e1prev_intext)
            };

            instances.push(Instance {
                e1_text,
                e1: event_vocab.lookup(&record.e1),
                e2: event_vocab.lookup(&record.e2),
                e1prev_intext,
            });
        }

        if dropped > 0 {
            log::info!("Filtered {dropped} instances with out-of-vocabulary events");
        }

        InstanceDataset {
            instances,
            min_text_width: options.min_text_width,
        }
    }

    /// The number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if the dataset holds no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The instance at `index`.
    pub fn get(
        &self,
        index: usize,
    ) -> &Instance {
        &self.instances[index]
    }

    /// All instances, in dataset order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The minimum text width the batch layer must honor.
    pub fn min_text_width(&self) -> usize {
        self.min_text_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PAD_TOK, UNK_ID, UNK_TOK};

    fn vocab_of(tokens: &[&str]) -> Vocab {
        let mut itos = vec![UNK_TOK.to_string(), PAD_TOK.to_string()];
        itos.extend(tokens.iter().map(|t| t.to_string()));
        Vocab::from_itos(itos)
    }

    fn record(
        text: &str,
        e1: &str,
        e2: &str,
        prev: &[&str],
    ) -> RawInstance {
        RawInstance {
            e1_text: text.to_string(),
            e1: e1.to_string(),
            e2: e2.to_string(),
            e1prev_intext: prev.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_numericalization() {
        let evocab = vocab_of(&["walk->dog", "feed->dog"]);
        let tvocab = vocab_of(&["the", "dog"]);

        let records = vec![record(
            "The  Dog barked",
            "walk->dog",
            "feed->dog",
            &["walk->dog"],
        )];

        let dataset =
            InstanceDataset::from_records(&records, &evocab, &tvocab, &DatasetOptions::new());

        assert_eq!(dataset.len(), 1);
        let inst = dataset.get(0);
        // "barked" is unseen and maps to unk.
        assert_eq!(inst.e1_text, vec![2, 3, UNK_ID]);
        assert_eq!(inst.text_len(), 3);
        assert_eq!(inst.e1, 2);
        assert_eq!(inst.e2, 3);
        assert_eq!(inst.e1prev_intext, vec![2]);
    }

    #[test]
    fn test_filter_unk_events_drops_oov_instances() {
        let evocab = vocab_of(&["walk->dog", "feed->dog"]);
        let tvocab = vocab_of(&["the"]);

        let records = vec![
            record("a", "walk->dog", "feed->dog", &[]),
            record("b", "walk->dog", "oov->event", &[]),
            record("c", "oov->event", "feed->dog", &[]),
        ];

        let filtered =
            InstanceDataset::from_records(&records, &evocab, &tvocab, &DatasetOptions::new());
        assert_eq!(filtered.len(), 1);

        let unfiltered = InstanceDataset::from_records(
            &records,
            &evocab,
            &tvocab,
            &DatasetOptions::new().with_filter_unk_events(false),
        );
        assert_eq!(unfiltered.len(), 3);
        // Retained with unknown-id substitution.
        assert_eq!(unfiltered.get(1).e2, UNK_ID);
        assert_eq!(unfiltered.get(2).e1, UNK_ID);
    }

    #[test]
    fn test_filter_unk_context() {
        let evocab = vocab_of(&["walk->dog", "feed->dog"]);
        let tvocab = vocab_of(&[]);

        let records = vec![record(
            "x",
            "walk->dog",
            "feed->dog",
            &["walk->dog", "oov->event", "feed->dog"],
        )];

        let default =
            InstanceDataset::from_records(&records, &evocab, &tvocab, &DatasetOptions::new());
        assert_eq!(default.get(0).e1prev_intext, vec![2, UNK_ID, 3]);

        let filtered = InstanceDataset::from_records(
            &records,
            &evocab,
            &tvocab,
            &DatasetOptions::new().with_filter_unk_context(true),
        );
        assert_eq!(filtered.get(0).e1prev_intext, vec![2, 3]);
    }

    #[test]
    fn test_filtering_is_deterministic() {
        let evocab = vocab_of(&["a->b", "b->c"]);
        let tvocab = vocab_of(&["t"]);

        let records = vec![
            record("t", "a->b", "b->c", &[]),
            record("t", "a->b", "zz->zz", &[]),
            record("t", "b->c", "a->b", &["a->b"]),
        ];

        let one = InstanceDataset::from_records(&records, &evocab, &tvocab, &DatasetOptions::new());
        let two = InstanceDataset::from_records(&records, &evocab, &tvocab, &DatasetOptions::new());

        assert_eq!(one.instances(), two.instances());
    }
}
