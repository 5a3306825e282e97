//! # Run Configuration
//!
//! The resolved configuration of a training run. CLI parsing lives
//! outside this crate; whatever front-end produces a [`RunConfig`] is
//! expected to persist it next to the checkpoint (see
//! [`RunConfig::persist_args`]) so a run can be reproduced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checkpoint::run_args_path;
use crate::errors::{CcResult, ChaincastError};
use crate::estimator::{ContextEncoder, Device, EventEncoding, VariantSpec};
use crate::optim::OptimizerKind;
use crate::utility::atomic_write_json;

/// All options a training run recognizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path to the training corpus (JSONL, or pre-parsed records when
    /// `load_parsed` is set).
    pub train_data: PathBuf,

    /// Path to the validation corpus.
    pub valid_data: PathBuf,

    /// Path to the event vocabulary file.
    pub evocab: PathBuf,

    /// Path to the text vocabulary file.
    pub tvocab: PathBuf,

    /// Size of event embeddings.
    pub event_embed_size: usize,

    /// Size of text embeddings.
    pub text_embed_size: usize,

    /// Size of the text encoder output.
    pub text_enc_output: usize,

    /// Size of the RNN hidden layer for component models.
    pub rnn_hidden_dim: usize,

    /// Initial learning rate.
    pub lr: f32,

    /// Log the smoothed training loss every this many iterations.
    pub log_every: usize,

    /// Run validation every this many iterations within an epoch.
    pub validate_after: usize,

    /// Optimizer family.
    pub optimizer: OptimizerKind,

    /// Gradient-norm clip threshold.
    pub clip: f32,

    /// Upper epoch limit.
    pub epochs: usize,

    /// Stop after this many epochs without validation improvement.
    pub stop_after: usize,

    /// Mini-batch size.
    pub batch_size: usize,

    /// Random seed for all random sources.
    pub seed: u64,

    /// Requested compute device.
    pub device: Device,

    /// Model checkpoint path.
    pub save_model: PathBuf,

    /// If set, load the model from this checkpoint instead of
    /// constructing it fresh; loaded state wins.
    pub load_model: Option<PathBuf>,

    /// If set, load optimizer state from this checkpoint.
    pub load_opt: Option<PathBuf>,

    /// Use one-hot event features instead of embeddings.
    pub onehot_events: bool,

    /// Combine `e1` with the previous context.
    pub combine_events: bool,

    /// Encode context events with an RNN.
    pub rnn_event_encoder: bool,

    /// Use pretrained word embeddings.
    pub use_pretrained: bool,

    /// Fine-tune a loaded model on out-of-text events.
    pub finetune: bool,

    /// Freeze loaded layers while fine-tuning.
    pub freeze: bool,

    /// Treat `train_data` as pre-parsed records (the cached fast path).
    pub load_parsed: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            train_data: PathBuf::new(),
            valid_data: PathBuf::new(),
            evocab: PathBuf::from("./data/evocab_freq25"),
            tvocab: PathBuf::from("./data/tvocab_freq100"),
            event_embed_size: 300,
            text_embed_size: 300,
            text_enc_output: 300,
            rnn_hidden_dim: 300,
            lr: 0.001,
            log_every: 500,
            validate_after: 5000,
            optimizer: OptimizerKind::Adam,
            clip: 10.0,
            epochs: 40,
            stop_after: 3,
            batch_size: 32,
            seed: 11,
            device: Device::Cpu,
            save_model: PathBuf::from("model_checkpoint.json"),
            load_model: None,
            load_opt: None,
            onehot_events: false,
            combine_events: false,
            rnn_event_encoder: false,
            use_pretrained: false,
            finetune: false,
            freeze: false,
            load_parsed: false,
        }
    }
}

impl RunConfig {
    /// Fail-fast startup validation.
    ///
    /// ## Errors
    /// A [`ChaincastError::Config`] naming the first problem found.
    pub fn validate(&self) -> CcResult<()> {
        fn require(
            path: &Path,
            what: &str,
        ) -> CcResult<()> {
            if path.as_os_str().is_empty() {
                return Err(ChaincastError::Config(format!("missing {what} path")));
            }
            Ok(())
        }

        require(&self.train_data, "train_data")?;
        require(&self.valid_data, "valid_data")?;
        require(&self.evocab, "evocab")?;
        require(&self.tvocab, "tvocab")?;
        require(&self.save_model, "save_model")?;

        if self.batch_size == 0 {
            return Err(ChaincastError::Config("batch_size must be > 0".to_string()));
        }
        if self.finetune && self.load_model.is_none() {
            return Err(ChaincastError::Config(
                "finetune requires load_model".to_string(),
            ));
        }
        if self.freeze && !self.finetune {
            return Err(ChaincastError::Config(
                "freeze requires finetune".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the estimator variant from the configuration flags.
    ///
    /// Runs [`Self::validate`] first, so an inconsistent flag set is a
    /// startup error rather than a mid-run surprise.
    pub fn variant(&self) -> CcResult<VariantSpec> {
        self.validate()?;

        Ok(VariantSpec {
            event_encoding: if self.onehot_events {
                EventEncoding::OneHot
            } else {
                EventEncoding::Embedded
            },
            context_encoder: if self.rnn_event_encoder {
                ContextEncoder::Rnn
            } else {
                ContextEncoder::Averaged
            },
            combine_events: self.combine_events,
            use_pretrained: self.use_pretrained,
            finetune: self.finetune,
            freeze: self.freeze,
        })
    }

    /// Persist the resolved configuration next to the checkpoint.
    pub fn persist_args(&self) -> CcResult<()> {
        atomic_write_json(run_args_path(&self.save_model), self)
    }

    /// Load a persisted configuration.
    pub fn load_args<P: AsRef<Path>>(path: P) -> CcResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SortKey;
    use tempdir::TempDir;

    fn minimal_config() -> RunConfig {
        RunConfig {
            train_data: PathBuf::from("train.jsonl"),
            valid_data: PathBuf::from("valid.jsonl"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_match_the_recognized_options() {
        let config = RunConfig::default();

        assert_eq!(config.event_embed_size, 300);
        assert_eq!(config.lr, 0.001);
        assert_eq!(config.log_every, 500);
        assert_eq!(config.validate_after, 5000);
        assert_eq!(config.optimizer, OptimizerKind::Adam);
        assert_eq!(config.clip, 10.0);
        assert_eq!(config.epochs, 40);
        assert_eq!(config.stop_after, 3);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.seed, 11);
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_validate_requires_paths() {
        assert!(RunConfig::default().validate().is_err());
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_finetune_flags_are_checked() {
        let mut config = minimal_config();
        config.finetune = true;
        assert!(config.validate().is_err());

        config.load_model = Some(PathBuf::from("model.json"));
        assert!(config.validate().is_ok());

        config.finetune = false;
        config.freeze = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_variant_resolution() {
        let mut config = minimal_config();
        config.onehot_events = true;
        config.rnn_event_encoder = true;

        let variant = config.variant().unwrap();
        assert_eq!(variant.event_encoding, EventEncoding::OneHot);
        assert_eq!(variant.context_encoder, ContextEncoder::Rnn);
        assert_eq!(variant.sort_key(), SortKey::ContextEvents);
    }

    #[test]
    fn test_persist_args_round_trip() {
        let dir = TempDir::new("chaincast-config").unwrap();

        let mut config = minimal_config();
        config.save_model = dir.path().join("model.json");
        config.persist_args().unwrap();

        let loaded = RunConfig::load_args(run_args_path(&config.save_model)).unwrap();
        assert_eq!(loaded, config);
    }
}
