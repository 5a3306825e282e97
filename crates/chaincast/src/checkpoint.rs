//! # Checkpoint IO
//!
//! Two independent artifacts per run: model parameters and optimizer
//! state. Both are overwritten in place whenever validation improves;
//! no versioned history is kept. Writes go through temp-then-rename so
//! a crash mid-write never destroys the previous checkpoint.
//!
//! The checkpoint path is a single-writer resource: concurrent runs
//! pointed at the same path are misuse (last write wins), not guarded.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::CcResult;
use crate::optim::Optimizer;
use crate::utility::atomic_write_json;

/// A snapshot of model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    /// The flat parameter buffer.
    pub params: Vec<f32>,
}

/// The optimizer-state path derived from a model checkpoint path.
pub fn optimizer_checkpoint_path<P: AsRef<Path>>(model_path: P) -> PathBuf {
    suffixed_path(model_path, "_optimizer")
}

/// The persisted run-arguments path derived from a model checkpoint path.
pub fn run_args_path<P: AsRef<Path>>(model_path: P) -> PathBuf {
    suffixed_path(model_path, "_args.json")
}

fn suffixed_path<P: AsRef<Path>>(
    path: P,
    suffix: &str,
) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Create the parent directory of a checkpoint path if missing.
pub fn ensure_save_dir<P: AsRef<Path>>(path: P) -> CcResult<()> {
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Save a model parameter snapshot.
pub fn save_model_checkpoint<P: AsRef<Path>>(
    path: P,
    checkpoint: &ModelCheckpoint,
) -> CcResult<()> {
    atomic_write_json(path, checkpoint)
}

/// Load a model parameter snapshot.
pub fn load_model_checkpoint<P: AsRef<Path>>(path: P) -> CcResult<ModelCheckpoint> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Save optimizer state.
pub fn save_optimizer_checkpoint<P: AsRef<Path>>(
    path: P,
    optimizer: &Optimizer,
) -> CcResult<()> {
    atomic_write_json(path, optimizer)
}

/// Load optimizer state.
pub fn load_optimizer_checkpoint<P: AsRef<Path>>(path: P) -> CcResult<Optimizer> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
