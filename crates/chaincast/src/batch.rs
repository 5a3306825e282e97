//! # Batching and Epoch Iteration
//!
//! Groups dataset instances into rectangular mini-batches.
//!
//! One [`BatchIter`] is one epoch: it yields batches until the dataset is
//! exhausted and never repeats automatically. The final batch of an epoch
//! may be smaller than the configured size.
//!
//! Padding is two-stage: every sequence in a batch is first padded to the
//! batch-local max length, and the text field is then extended to the
//! dataset's minimum width if still shorter. A fixed-kernel text encoder
//! requires that floor irrespective of batch composition.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::{Instance, InstanceDataset};
use crate::types::{PAD_ID, TokenId};

/// The within-batch length sort key.
///
/// Which field drives the sort depends on the estimator variant: RNN
/// event encoders pack the context-event sequence, while text-centric
/// variants pack the text sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Sort by the context-event count.
    #[default]
    ContextEvents,

    /// Sort by the text-token count.
    TextTokens,
}

impl SortKey {
    fn of(
        &self,
        instance: &Instance,
    ) -> usize {
        match self {
            SortKey::ContextEvents => instance.context_len(),
            SortKey::TextTokens => instance.text_len(),
        }
    }
}

/// A rectangular stacking of instances.
///
/// Sequence fields are padded with [`PAD_ID`]; the true lengths ride
/// alongside for downstream masking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Text-token ids, one padded row per instance.
    pub e1_text: Vec<Vec<TokenId>>,

    /// True (pre-pad) text lengths.
    pub e1_text_lens: Vec<usize>,

    /// Current event ids.
    pub e1: Vec<TokenId>,

    /// Next event ids; the prediction targets.
    pub e2: Vec<TokenId>,

    /// Context-event ids, one padded row per instance.
    pub e1prev_intext: Vec<Vec<TokenId>>,

    /// True (pre-pad) context lengths.
    pub e1prev_lens: Vec<usize>,
}

impl Batch {
    /// The number of instances in the batch.
    pub fn len(&self) -> usize {
        self.e2.len()
    }

    /// Returns true if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.e2.is_empty()
    }
}

/// Options for [`BatchIter`].
#[derive(Debug, Clone)]
pub struct BatchIterOptions {
    /// The number of instances per batch.
    pub batch_size: usize,

    /// The within-batch sort key.
    pub sort_key: SortKey,
}

impl Default for BatchIterOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            sort_key: SortKey::default(),
        }
    }
}

impl BatchIterOptions {
    /// Create default options.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the batch size.
    pub fn with_batch_size(
        self,
        batch_size: usize,
    ) -> Self {
        Self { batch_size, ..self }
    }

    /// Sets the sort key.
    pub fn with_sort_key(
        self,
        sort_key: SortKey,
    ) -> Self {
        Self { sort_key, ..self }
    }
}

/// One epoch's worth of batches over an [`InstanceDataset`].
pub struct BatchIter<'a> {
    dataset: &'a InstanceDataset,
    options: BatchIterOptions,
    order: Vec<usize>,
    cursor: usize,
}

impl<'a> BatchIter<'a> {
    /// Create a deterministic (evaluation-mode) iterator.
    ///
    /// Instances are visited in dataset order; repeated passes over the
    /// same dataset yield identical batches.
    pub fn new(
        dataset: &'a InstanceDataset,
        options: &BatchIterOptions,
    ) -> Self {
        let order = (0..dataset.len()).collect();
        BatchIter {
            dataset,
            options: options.clone(),
            order,
            cursor: 0,
        }
    }

    /// Create a shuffled (training-mode) iterator.
    ///
    /// The epoch's instance order is drawn from the caller's RNG, so
    /// batch membership changes every epoch while remaining reproducible
    /// under a fixed seed.
    pub fn shuffled(
        dataset: &'a InstanceDataset,
        options: &BatchIterOptions,
        rng: &mut StdRng,
    ) -> Self {
        let mut iter = Self::new(dataset, options);
        iter.order.shuffle(rng);
        iter
    }

    fn assemble(
        &self,
        indices: &[usize],
    ) -> Batch {
        let mut indices = indices.to_vec();
        // Longest-first within the batch; the sort is local and never
        // reorders across batches.
        indices.sort_by_key(|&i| core::cmp::Reverse(self.options.sort_key.of(self.dataset.get(i))));

        let instances: Vec<&Instance> = indices.iter().map(|&i| self.dataset.get(i)).collect();

        let text_width = instances
            .iter()
            .map(|inst| inst.text_len())
            .max()
            .unwrap_or(0)
            .max(self.dataset.min_text_width());
        let context_width = instances
            .iter()
            .map(|inst| inst.context_len())
            .max()
            .unwrap_or(0);

        let mut batch = Batch {
            e1_text: Vec::with_capacity(instances.len()),
            e1_text_lens: Vec::with_capacity(instances.len()),
            e1: Vec::with_capacity(instances.len()),
            e2: Vec::with_capacity(instances.len()),
            e1prev_intext: Vec::with_capacity(instances.len()),
            e1prev_lens: Vec::with_capacity(instances.len()),
        };

        for inst in instances {
            batch.e1_text.push(pad_to(&inst.e1_text, text_width));
            batch.e1_text_lens.push(inst.text_len());
            batch.e1.push(inst.e1);
            batch.e2.push(inst.e2);
            batch
                .e1prev_intext
                .push(pad_to(&inst.e1prev_intext, context_width));
            batch.e1prev_lens.push(inst.context_len());
        }

        batch
    }
}

fn pad_to(
    ids: &[TokenId],
    width: usize,
) -> Vec<TokenId> {
    let mut row = ids.to_vec();
    if row.len() < width {
        row.resize(width, PAD_ID);
    }
    row
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.options.batch_size).min(self.order.len());
        let batch = self.assemble(&self.order[self.cursor..end]);
        self.cursor = end;

        Some(batch)
    }
}
