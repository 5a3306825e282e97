//! # `chaincast` Event-Chain Estimator Training
//!
//! Training and evaluation loop for causal event-chain estimators:
//! given the textual description of an event and its surrounding
//! context, an estimator predicts the subsequent event in the chain.
//!
//! This crate owns the data contracts and control flow; the concrete
//! neural architectures live behind the [`estimator::Estimator`] trait.
//!
//! See:
//! * [`vocab`] to build and persist event/text vocabularies.
//! * [`dataset`] to numericalize a corpus into training instances.
//! * [`batch`] for epoch iteration and padding.
//! * [`train`] for the training loop, validation, and early stopping.
//! * [`checkpoint`] for model/optimizer checkpoint IO.
//!
//! ## Data Flow
//!
//! ```text
//! corpus (JSONL) ──▶ vocab builder ──▶ persisted vocab
//!                                          │
//! corpus (JSONL) ──▶ instance dataset ◀────┘
//!                         │
//!                     batch iter ──▶ trainer ──▶ estimator ──▶ loss
//!                                        │
//!                                   checkpoint
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chaincast::config::RunConfig;
//! use chaincast::dataset::{DatasetOptions, InstanceDataset};
//! use chaincast::train::Trainer;
//! use chaincast::vocab::load_vocab_path;
//!
//! let config = RunConfig {
//!     train_data: "train.jsonl".into(),
//!     valid_data: "valid.jsonl".into(),
//!     ..Default::default()
//! };
//!
//! let evocab = load_vocab_path(&config.evocab)?;
//! let tvocab = load_vocab_path(&config.tvocab)?;
//!
//! let model = MyEstimator::new(&config, &evocab, &tvocab);
//! let options = DatasetOptions::new().with_min_text_width(model.min_text_width());
//!
//! let train_ds = InstanceDataset::from_path(&config.train_data, &evocab, &tvocab, &options)?;
//! let valid_ds = InstanceDataset::from_path(&config.valid_data, &evocab, &tvocab, &options)?;
//!
//! let mut trainer = Trainer::new(model, config)?;
//! let report = trainer.run(&train_ds, &valid_ds)?;
//! ```

pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod errors;
pub mod estimator;
pub mod loss;
pub mod optim;
pub mod train;
pub mod types;
pub mod utility;
pub mod vocab;

pub use batch::{Batch, BatchIter, BatchIterOptions, SortKey};
pub use config::RunConfig;
pub use dataset::{DatasetOptions, Instance, InstanceDataset};
pub use errors::{CcResult, ChaincastError};
pub use estimator::{Device, Estimator, Logits, VariantSpec};
pub use optim::{Optimizer, OptimizerKind};
pub use train::{TrainReport, TrainState, Trainer};
pub use types::{PAD_ID, PAD_TOK, TokenId, UNK_ID, UNK_TOK};
pub use vocab::Vocab;
