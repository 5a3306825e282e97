//! # Vocabulary IO
//!
//! Vocabularies persist as a single JSON document. Writes go through a
//! temp-file-then-rename so a partially written file is never the only
//! copy on disk.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::errors::CcResult;
use crate::utility::atomic_write_json;
use crate::vocab::token_vocab::Vocab;

/// Save a [`Vocab`] to a file.
///
/// ## Arguments
/// * `vocab` - the vocabulary to save.
/// * `path` - the path to save the vocabulary to.
pub fn save_vocab_path<P: AsRef<Path>>(
    vocab: &Vocab,
    path: P,
) -> CcResult<()> {
    atomic_write_json(path, vocab)
}

/// Load a [`Vocab`] from a file.
///
/// ## Arguments
/// * `path` - the path to the vocabulary file.
pub fn load_vocab_path<P: AsRef<Path>>(path: P) -> CcResult<Vocab> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
