//! # Training Loop
//!
//! Orchestrates epochs, mini-batch updates, gradient clipping, periodic
//! validation, best-checkpoint tracking, and early stopping.
//!
//! Single-threaded and synchronous: batches are consumed strictly in
//! iterator order, and validation completes fully before training
//! resumes. Model and optimizer state are mutated only by the batch
//! step; validation takes an evaluation-mode view and restores training
//! mode afterward.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::batch::{Batch, BatchIter, BatchIterOptions};
use crate::checkpoint::{
    ModelCheckpoint, ensure_save_dir, load_model_checkpoint, load_optimizer_checkpoint,
    optimizer_checkpoint_path, save_model_checkpoint, save_optimizer_checkpoint,
};
use crate::config::RunConfig;
use crate::dataset::InstanceDataset;
use crate::errors::{CcResult, ChaincastError};
use crate::estimator::{Device, Estimator, VariantSpec};
use crate::loss::{LossOutput, clip_grad_norm, cross_entropy};
use crate::optim::Optimizer;

/// The rolling-window length for the smoothed training loss.
const LOSS_WINDOW: usize = 50;

/// Mutable state of a training run.
#[derive(Debug, Clone)]
pub struct TrainState {
    /// The current epoch index.
    pub epoch: usize,

    /// Best validation loss seen so far.
    pub best_valid_loss: f64,

    /// The epoch at which the best was achieved. Initialized to the
    /// epoch limit, signaling "no improvement yet"; the early-stop
    /// distance is then negative and can never fire spuriously.
    pub best_epoch: usize,

    recent_losses: VecDeque<f64>,
}

impl TrainState {
    /// Create the initial state for a run with the given epoch limit.
    pub fn new(epoch_limit: usize) -> Self {
        TrainState {
            epoch: 0,
            best_valid_loss: f64::INFINITY,
            best_epoch: epoch_limit,
            recent_losses: VecDeque::with_capacity(LOSS_WINDOW),
        }
    }

    /// Record a training loss in the rolling window.
    pub fn record_loss(
        &mut self,
        loss: f64,
    ) {
        if self.recent_losses.len() == LOSS_WINDOW {
            self.recent_losses.pop_front();
        }
        self.recent_losses.push_back(loss);
    }

    /// The mean of the most recent training losses (at most 50).
    pub fn smoothed_loss(&self) -> f64 {
        if self.recent_losses.is_empty() {
            return f64::NAN;
        }
        self.recent_losses.iter().sum::<f64>() / self.recent_losses.len() as f64
    }

    /// Observe a validation result.
    ///
    /// ## Returns
    /// True on strict improvement (`loss < best`); equal loss is not an
    /// improvement and must not trigger a checkpoint.
    pub fn observe_validation(
        &mut self,
        loss: f64,
    ) -> bool {
        if loss < self.best_valid_loss {
            self.best_valid_loss = loss;
            self.best_epoch = self.epoch;
            true
        } else {
            false
        }
    }

    /// Returns true when the patience threshold is exhausted.
    pub fn should_stop(
        &self,
        stop_after: usize,
    ) -> bool {
        self.epoch
            .checked_sub(self.best_epoch)
            .is_some_and(|gap| gap >= stop_after)
    }

    fn best_display(&self) -> String {
        if self.best_valid_loss.is_infinite() {
            "NA".to_string()
        } else {
            format!("{:.3} at epoch {}", self.best_valid_loss, self.best_epoch)
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Best validation loss observed.
    pub best_valid_loss: f64,

    /// The epoch that produced it.
    pub best_epoch: usize,

    /// The number of epochs actually run.
    pub epochs_run: usize,

    /// Whether the patience threshold fired before the epoch limit.
    pub stopped_early: bool,
}

/// The training-loop driver.
///
/// Generic over the estimator; holds the model, the optimizer, the run
/// configuration, and the evolving [`TrainState`].
pub struct Trainer<M: Estimator> {
    model: M,
    optimizer: Optimizer,
    config: RunConfig,
    variant: VariantSpec,
    device: Device,
    state: TrainState,
    rng: StdRng,
}

impl<M: Estimator> Trainer<M> {
    /// Initialize a run.
    ///
    /// Resolves the variant (fail-fast on inconsistent flags), restores
    /// model/optimizer checkpoints when load paths are set (loaded state
    /// wins over fresh construction), seeds the RNG, resolves the
    /// device, and persists the run arguments next to the checkpoint.
    ///
    /// ## Arguments
    /// * `model` - the freshly constructed (or to-be-restored) estimator.
    /// * `config` - the resolved run configuration.
    pub fn new(
        mut model: M,
        config: RunConfig,
    ) -> CcResult<Self> {
        let variant = config.variant()?;

        if let Some(path) = &config.load_model {
            log::info!("Loading the model from {}", path.display());
            let checkpoint = load_model_checkpoint(path)?;
            model.restore(&checkpoint.params)?;
        } else {
            log::info!("Using the freshly constructed model");
        }

        let optimizer = match &config.load_opt {
            Some(path) => {
                log::info!("Loading the optimizer state from {}", path.display());
                load_optimizer_checkpoint(path)?
            }
            None => {
                log::info!("Creating {} optimizer anew", config.optimizer);
                Optimizer::new(config.optimizer, config.lr, model.parameter_count())
            }
        };

        let device = Device::resolve(config.device, model.supports_accelerator());

        let rng = StdRng::seed_from_u64(config.seed);

        ensure_save_dir(&config.save_model)?;
        config.persist_args()?;

        let state = TrainState::new(config.epochs);

        Ok(Trainer {
            model,
            optimizer,
            config,
            variant,
            device,
            state,
            rng,
        })
    }

    /// The device the run resolved to.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The current training state.
    pub fn state(&self) -> &TrainState {
        &self.state
    }

    /// The model under training.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the trainer, yielding the model.
    pub fn into_model(self) -> M {
        self.model
    }

    fn batch_options(&self) -> BatchIterOptions {
        BatchIterOptions::new()
            .with_batch_size(self.config.batch_size)
            .with_sort_key(self.variant.sort_key())
    }

    /// Run the main training loop.
    ///
    /// ## Arguments
    /// * `train_dataset` - the training instances.
    /// * `valid_dataset` - the held-out instances.
    ///
    /// ## Returns
    /// A [`TrainReport`] summarizing the run.
    pub fn run(
        &mut self,
        train_dataset: &InstanceDataset,
        valid_dataset: &InstanceDataset,
    ) -> CcResult<TrainReport> {
        let options = self.batch_options();

        log::info!(
            "Training on {} instances, validating on {}",
            train_dataset.len(),
            valid_dataset.len()
        );

        if self.variant.finetune {
            let vloss = self.validation(valid_dataset)?;
            log::info!("Pre-finetune validation loss: {vloss:.3}");
        }

        let mut epochs_run = 0;
        let mut stopped_early = false;

        for epoch in 0..self.config.epochs {
            self.state.epoch = epoch;
            epochs_run = epoch + 1;

            let batches = BatchIter::shuffled(train_dataset, &options, &mut self.rng);
            for (iteration, batch) in batches.enumerate() {
                let loss = self.train_step(&batch)?;
                self.state.record_loss(loss);

                // Iteration 0 is skipped to avoid a one-sample average.
                if iteration != 0 && iteration % self.config.log_every == 0 {
                    log::info!(
                        "Epoch/iteration {}/{}, past-{} average loss {:.4}, best validation {}",
                        epoch,
                        iteration,
                        LOSS_WINDOW,
                        self.state.smoothed_loss(),
                        self.state.best_display(),
                    );
                }

                if iteration != 0 && iteration % self.config.validate_after == 0 {
                    log::info!("Running validation at epoch/iteration {epoch}/{iteration}");
                    self.validate_and_checkpoint(valid_dataset)?;
                }
            }

            log::info!("End of epoch {epoch}, running validation");
            self.validate_and_checkpoint(valid_dataset)?;

            if self.state.should_stop(self.config.stop_after) {
                log::info!(
                    "No improvement in {} epochs, terminating at epoch {}",
                    self.config.stop_after,
                    epoch
                );
                log::info!("Best validation loss: {}", self.state.best_display());
                stopped_early = true;
                break;
            }
        }

        Ok(TrainReport {
            best_valid_loss: self.state.best_valid_loss,
            best_epoch: self.state.best_epoch,
            epochs_run,
            stopped_early,
        })
    }

    /// One mini-batch update.
    ///
    /// Side effects are strictly ordered: zero-grad, forward,
    /// cross-entropy against the true next event, backward, clip, then
    /// one optimizer step.
    fn train_step(
        &mut self,
        batch: &Batch,
    ) -> CcResult<f64> {
        self.model.set_train_mode(true);
        self.model.zero_grad();

        let logits = self.model.forward(batch)?;
        let LossOutput { loss, grad_logits } = cross_entropy(&logits, &batch.e2)?;

        self.model.backward(&grad_logits)?;
        clip_grad_norm(self.model.gradients_mut(), self.config.clip);

        let (params, grads) = self.model.params_and_grads();
        self.optimizer.step(params, grads)?;

        Ok(loss)
    }

    /// Compute the validation loss in evaluation mode.
    pub fn validation(
        &mut self,
        valid_dataset: &InstanceDataset,
    ) -> CcResult<f64> {
        let options = self.batch_options();
        let batches = BatchIter::new(valid_dataset, &options);

        self.model.set_train_mode(false);
        let result = weighted_validation_loss(&mut self.model, batches);
        self.model.set_train_mode(true);

        result
    }

    fn validate_and_checkpoint(
        &mut self,
        valid_dataset: &InstanceDataset,
    ) -> CcResult<f64> {
        let vloss = self.validation(valid_dataset)?;
        log::info!(
            "Validation loss at epoch {}: {:.3} - best: {}",
            self.state.epoch,
            vloss,
            self.state.best_display(),
        );

        if self.state.observe_validation(vloss) {
            log::info!("New validation best, saving model checkpoint");
            save_model_checkpoint(
                &self.config.save_model,
                &ModelCheckpoint {
                    params: self.model.snapshot(),
                },
            )?;
            save_optimizer_checkpoint(
                optimizer_checkpoint_path(&self.config.save_model),
                &self.optimizer,
            )?;
        }

        Ok(vloss)
    }
}

/// The instance-count-weighted average loss over a batch stream.
///
/// Each batch's mean loss is weighted by its instance count, so batches
/// of unequal size (the final partial batch in particular) contribute
/// proportionally. Runs forward passes only; never calls backward.
pub fn weighted_validation_loss<M, I>(
    model: &mut M,
    batches: I,
) -> CcResult<f64>
where
    M: Estimator,
    I: Iterator<Item = Batch>,
{
    let mut total = 0.0f64;
    let mut instances_seen = 0usize;

    for batch in batches {
        let logits = model.forward(&batch)?;
        let LossOutput { loss, .. } = cross_entropy(&logits, &batch.e2)?;

        total += loss * batch.len() as f64;
        instances_seen += batch.len();
    }

    if instances_seen == 0 {
        return Err(ChaincastError::Config(
            "validation over an empty dataset".to_string(),
        ));
    }

    Ok(total / instances_seen as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::Logits;

    #[test]
    fn test_rolling_window_caps_at_50() {
        let mut state = TrainState::new(10);
        for i in 0..120 {
            state.record_loss(f64::from(i));
        }

        // Mean of 70..=119.
        let expected = (70..120).sum::<i32>() as f64 / 50.0;
        assert!((state.smoothed_loss() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_strict_improvement_only() {
        let mut state = TrainState::new(10);

        assert!(state.observe_validation(1.0));
        assert!(!state.observe_validation(1.0));
        assert!(!state.observe_validation(1.5));
        assert!(state.observe_validation(0.9));
    }

    #[test]
    fn test_early_stop_on_plateau() {
        // Losses [0.9, 0.8, 0.8, 0.8] with stop_after=2 stop at epoch 3.
        let losses = [0.9, 0.8, 0.8, 0.8, 0.7];
        let mut state = TrainState::new(40);

        let mut stopped_at = None;
        for (epoch, &loss) in losses.iter().enumerate() {
            state.epoch = epoch;
            state.observe_validation(loss);
            if state.should_stop(2) {
                stopped_at = Some(epoch);
                break;
            }
        }

        assert_eq!(stopped_at, Some(3));
        assert_eq!(state.best_epoch, 1);
    }

    #[test]
    fn test_no_spurious_stop_before_any_improvement() {
        // best_epoch starts at the epoch limit; the gap is negative.
        let mut state = TrainState::new(40);
        for epoch in 0..10 {
            state.epoch = epoch;
            assert!(!state.should_stop(3));
        }
    }

    /// Yields logits engineered to hit a scripted per-batch mean loss,
    /// keyed by batch size.
    struct ScriptedEstimator;

    impl ScriptedEstimator {
        // With 2 classes, logits [a, 0] and target 0:
        // loss = ln(1 + exp(-a)), so a = -ln(exp(loss) - 1).
        fn logit_for_loss(loss: f64) -> f32 {
            (-(loss.exp() - 1.0).ln()) as f32
        }
    }

    impl Estimator for ScriptedEstimator {
        fn forward(
            &mut self,
            batch: &Batch,
        ) -> CcResult<Logits> {
            let loss = match batch.len() {
                3 => 1.0,
                5 => 2.0,
                n => panic!("unexpected batch size {n}"),
            };
            let a = Self::logit_for_loss(loss);
            Ok(vec![vec![a, 0.0]; batch.len()])
        }

        fn backward(
            &mut self,
            _grad_logits: &Logits,
        ) -> CcResult<()> {
            panic!("validation must not call backward");
        }

        fn zero_grad(&mut self) {}

        fn set_train_mode(
            &mut self,
            _train: bool,
        ) {
        }

        fn min_text_width(&self) -> usize {
            1
        }

        fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
            (&mut [], &[])
        }

        fn gradients_mut(&mut self) -> &mut [f32] {
            &mut []
        }

        fn parameter_count(&self) -> usize {
            0
        }

        fn snapshot(&self) -> Vec<f32> {
            Vec::new()
        }

        fn restore(
            &mut self,
            _params: &[f32],
        ) -> CcResult<()> {
            Ok(())
        }
    }

    fn batch_of(size: usize) -> Batch {
        Batch {
            e1_text: vec![vec![1]; size],
            e1_text_lens: vec![1; size],
            e1: vec![0; size],
            e2: vec![0; size],
            e1prev_intext: vec![Vec::new(); size],
            e1prev_lens: vec![0; size],
        }
    }

    #[test]
    fn test_weighted_validation_loss() {
        // Sizes [3, 5] with mean losses [1.0, 2.0]:
        // (3*1.0 + 5*2.0) / 8 = 1.625.
        let mut model = ScriptedEstimator;
        let batches = vec![batch_of(3), batch_of(5)];

        let loss = weighted_validation_loss(&mut model, batches.into_iter()).unwrap();

        assert!((loss - 1.625).abs() < 1e-4, "got {loss}");
    }

    #[test]
    fn test_empty_validation_is_an_error() {
        let mut model = ScriptedEstimator;
        let loss = weighted_validation_loss(&mut model, Vec::new().into_iter());

        assert!(loss.is_err());
    }
}
