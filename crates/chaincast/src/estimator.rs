//! # Estimator Interface
//!
//! The neural estimator is an external collaborator: concrete
//! architectures live outside this crate, behind the [`Estimator`]
//! trait. The trainer only needs the expected-outcome head's logits, a
//! backward entry point, and flat parameter/gradient views for the
//! optimizer and the gradient clipper.

use serde::{Deserialize, Serialize};

use crate::batch::{Batch, SortKey};
use crate::errors::CcResult;

/// Expected-outcome logits: one row per batch instance, one column per
/// event-vocabulary entry.
pub type Logits = Vec<Vec<f32>>;

/// Contract for models trainable by the [`Trainer`](crate::train::Trainer).
pub trait Estimator {
    /// Forward pass producing the expected-outcome head's logits.
    fn forward(
        &mut self,
        batch: &Batch,
    ) -> CcResult<Logits>;

    /// Backward pass from the logit gradients of the most recent
    /// [`Self::forward`] call, accumulating into the gradient buffer.
    fn backward(
        &mut self,
        grad_logits: &Logits,
    ) -> CcResult<()>;

    /// Zero the accumulated gradients.
    fn zero_grad(&mut self);

    /// Switch between training and evaluation mode.
    ///
    /// Evaluation mode must not mutate parameters; the trainer enters it
    /// around validation and restores training mode afterward.
    fn set_train_mode(
        &mut self,
        train: bool,
    );

    /// The largest receptive-field size among components that convolve
    /// over the text sequence; the dataset pads text to this floor.
    fn min_text_width(&self) -> usize;

    /// Whether an accelerator backend is available to this estimator.
    ///
    /// Defaults to false; [`Device::resolve`] degrades an accelerator
    /// request to CPU execution when no backend answers for it.
    fn supports_accelerator(&self) -> bool {
        false
    }

    /// Flat views of the trainable parameters and their gradients, for
    /// one optimizer step.
    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]);

    /// Mutable flat view of the gradients, for norm clipping.
    fn gradients_mut(&mut self) -> &mut [f32];

    /// The number of trainable parameters.
    fn parameter_count(&self) -> usize;

    /// Snapshot the parameters for checkpointing.
    fn snapshot(&self) -> Vec<f32>;

    /// Restore parameters from a checkpoint snapshot.
    fn restore(
        &mut self,
        params: &[f32],
    ) -> CcResult<()>;
}

/// Compute device for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,

    /// An attached accelerator.
    Accelerator,
}

impl Device {
    /// Resolve the requested device against availability.
    ///
    /// Accelerator mismatches degrade to a logged warning and CPU
    /// execution; they are never a hard failure.
    pub fn resolve(
        requested: Device,
        available: bool,
    ) -> Device {
        match (requested, available) {
            (Device::Accelerator, true) => Device::Accelerator,
            (Device::Accelerator, false) => {
                log::warn!("Accelerator requested but unavailable, falling back to CPU");
                Device::Cpu
            }
            (Device::Cpu, true) => {
                log::warn!("An accelerator is available but unused, running on CPU");
                Device::Cpu
            }
            (Device::Cpu, false) => Device::Cpu,
        }
    }
}

/// How the estimator encodes input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventEncoding {
    /// Learned event embeddings.
    #[default]
    Embedded,

    /// One-hot event features.
    OneHot,
}

/// How the estimator encodes the context-event bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextEncoder {
    /// Order-insensitive averaging.
    #[default]
    Averaged,

    /// Recurrent encoding over the context sequence.
    Rnn,
}

/// The estimator variant, resolved once at startup.
///
/// Configuration flags collapse into this single strategy value instead
/// of being re-checked throughout the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Input event encoding.
    pub event_encoding: EventEncoding,

    /// Context-bag encoder.
    pub context_encoder: ContextEncoder,

    /// Combine `e1` with the previous context.
    pub combine_events: bool,

    /// Initialize text embeddings from pretrained vectors.
    pub use_pretrained: bool,

    /// Fine-tune a loaded model on out-of-text events.
    pub finetune: bool,

    /// Freeze the loaded layers while fine-tuning; the output head
    /// stays trainable.
    pub freeze: bool,
}

impl VariantSpec {
    /// The batch sort key this variant packs by.
    ///
    /// Recurrent context encoders pack the context-event sequence;
    /// averaging encoders are order-insensitive there, so text packing
    /// wins instead.
    pub fn sort_key(&self) -> SortKey {
        match self.context_encoder {
            ContextEncoder::Rnn => SortKey::ContextEvents,
            ContextEncoder::Averaged => SortKey::TextTokens,
        }
    }
}
