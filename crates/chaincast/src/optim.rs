//! # Optimizers
//!
//! First-order optimizers over flat parameter/gradient slices. The
//! optimizer state is serde-serializable and persists independently of
//! the model checkpoint, so a resumed run steps exactly as the original
//! would have.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CcResult, ChaincastError};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;
const ADAGRAD_EPS: f32 = 1e-10;

/// The optimizer family selected by the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Adam with the conventional moment defaults.
    #[default]
    Adam,

    /// Adagrad with per-parameter accumulators.
    Adagrad,

    /// Plain stochastic gradient descent.
    Sgd,
}

impl FromStr for OptimizerKind {
    type Err = ChaincastError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "adam" => Ok(OptimizerKind::Adam),
            "adagrad" => Ok(OptimizerKind::Adagrad),
            "sgd" => Ok(OptimizerKind::Sgd),
            _ => Err(ChaincastError::UnknownOptimizer {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            OptimizerKind::Adam => "adam",
            OptimizerKind::Adagrad => "adagrad",
            OptimizerKind::Sgd => "sgd",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum OptimState {
    Sgd,
    Adagrad { accum: Vec<f32> },
    Adam { m: Vec<f32>, v: Vec<f32>, t: u64 },
}

/// A stateful optimizer over flat parameter buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimizer {
    lr: f32,
    state: OptimState,
}

impl Optimizer {
    /// Create a fresh optimizer.
    ///
    /// ## Arguments
    /// * `kind` - the optimizer family.
    /// * `lr` - the learning rate.
    /// * `parameter_count` - the flat parameter buffer length.
    pub fn new(
        kind: OptimizerKind,
        lr: f32,
        parameter_count: usize,
    ) -> Self {
        let state = match kind {
            OptimizerKind::Sgd => OptimState::Sgd,
            OptimizerKind::Adagrad => OptimState::Adagrad {
                accum: vec![0.0; parameter_count],
            },
            OptimizerKind::Adam => OptimState::Adam {
                m: vec![0.0; parameter_count],
                v: vec![0.0; parameter_count],
                t: 0,
            },
        };
        Optimizer { lr, state }
    }

    /// The optimizer family.
    pub fn kind(&self) -> OptimizerKind {
        match self.state {
            OptimState::Sgd => OptimizerKind::Sgd,
            OptimState::Adagrad { .. } => OptimizerKind::Adagrad,
            OptimState::Adam { .. } => OptimizerKind::Adam,
        }
    }

    /// The learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.lr
    }

    /// Apply one update step.
    ///
    /// ## Arguments
    /// * `params` - the flat parameter buffer; updated in place.
    /// * `grads` - the matching gradient buffer.
    pub fn step(
        &mut self,
        params: &mut [f32],
        grads: &[f32],
    ) -> CcResult<()> {
        if params.len() != grads.len() {
            return Err(ChaincastError::Estimator(format!(
                "parameter/gradient length mismatch: {} vs {}",
                params.len(),
                grads.len()
            )));
        }

        match &mut self.state {
            OptimState::Sgd => {
                for (p, &g) in params.iter_mut().zip(grads) {
                    *p -= self.lr * g;
                }
            }
            OptimState::Adagrad { accum } => {
                if accum.len() != params.len() {
                    return Err(ChaincastError::CheckpointShape {
                        expected: params.len(),
                        found: accum.len(),
                    });
                }
                for ((p, &g), a) in params.iter_mut().zip(grads).zip(accum.iter_mut()) {
                    *a += g * g;
                    *p -= self.lr * g / (a.sqrt() + ADAGRAD_EPS);
                }
            }
            OptimState::Adam { m, v, t } => {
                if m.len() != params.len() {
                    return Err(ChaincastError::CheckpointShape {
                        expected: params.len(),
                        found: m.len(),
                    });
                }
                *t += 1;
                let t = *t as i32;
                let bias1 = 1.0 - ADAM_BETA1.powi(t);
                let bias2 = 1.0 - ADAM_BETA2.powi(t);

                for (i, (p, &g)) in params.iter_mut().zip(grads).enumerate() {
                    m[i] = ADAM_BETA1 * m[i] + (1.0 - ADAM_BETA1) * g;
                    v[i] = ADAM_BETA2 * v[i] + (1.0 - ADAM_BETA2) * g * g;

                    let m_hat = m[i] / bias1;
                    let v_hat = v[i] / bias2;
                    *p -= self.lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("adam".parse::<OptimizerKind>().unwrap(), OptimizerKind::Adam);
        assert_eq!(
            "adagrad".parse::<OptimizerKind>().unwrap(),
            OptimizerKind::Adagrad
        );
        assert_eq!("sgd".parse::<OptimizerKind>().unwrap(), OptimizerKind::Sgd);

        let err = "rmsprop".parse::<OptimizerKind>().unwrap_err();
        assert!(err.to_string().contains("rmsprop"));
    }

    #[test]
    fn test_sgd_step() {
        let mut opt = Optimizer::new(OptimizerKind::Sgd, 0.1, 2);
        let mut params = vec![1.0, -1.0];

        opt.step(&mut params, &[0.5, -0.5]).unwrap();

        assert_eq!(params, vec![0.95, -0.95]);
    }

    #[test]
    fn test_adam_first_step_magnitude() {
        // With bias correction, the first Adam step is ~lr in magnitude.
        let mut opt = Optimizer::new(OptimizerKind::Adam, 0.01, 2);
        let mut params = vec![0.0, 0.0];

        opt.step(&mut params, &[1.0, -3.0]).unwrap();

        assert!((params[0] + 0.01).abs() < 1e-4);
        assert!((params[1] - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_adagrad_shrinks_repeated_steps() {
        let mut opt = Optimizer::new(OptimizerKind::Adagrad, 0.1, 1);
        let mut params = vec![0.0];

        opt.step(&mut params, &[1.0]).unwrap();
        let first = -params[0];

        opt.step(&mut params, &[1.0]).unwrap();
        let second = -params[0] - first;

        assert!(first > 0.0);
        assert!(second > 0.0);
        assert!(second < first);
    }

    #[test]
    fn test_step_shape_mismatch() {
        let mut opt = Optimizer::new(OptimizerKind::Sgd, 0.1, 2);
        let mut params = vec![0.0, 0.0];

        assert!(opt.step(&mut params, &[1.0]).is_err());
    }

    #[test]
    fn test_state_round_trip_resumes_identically() {
        let mut live = Optimizer::new(OptimizerKind::Adam, 0.05, 3);
        let mut params_live = vec![1.0, 2.0, 3.0];

        live.step(&mut params_live, &[0.1, -0.2, 0.3]).unwrap();

        let blob = serde_json::to_string(&live).unwrap();
        let mut restored: Optimizer = serde_json::from_str(&blob).unwrap();
        assert_eq!(restored, live);

        let mut params_restored = params_live.clone();
        live.step(&mut params_live, &[0.4, 0.5, -0.6]).unwrap();
        restored.step(&mut params_restored, &[0.4, 0.5, -0.6]).unwrap();

        assert_eq!(params_live, params_restored);
    }
}
