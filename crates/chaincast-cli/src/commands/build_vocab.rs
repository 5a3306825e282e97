use std::path::PathBuf;

use chaincast::vocab::{VocabBuilderOptions, build_event_vocab, build_text_vocab};

use crate::logging::LogArgs;

/// Corpus fields a vocabulary can be induced from.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum VocabField {
    /// The `e1` event identifiers.
    Event,

    /// The lower-cased, whitespace-tokenized `e1_text` spans.
    Text,
}

/// Args for the build-vocab command.
#[derive(clap::Args, Debug)]
pub struct BuildVocabArgs {
    /// Corpus file (JSONL).
    corpus: PathBuf,

    #[clap(flatten)]
    pub logging: LogArgs,

    /// Which corpus field to count.
    #[arg(long, default_value = "event")]
    field: VocabField,

    /// Minimum corpus frequency for inclusion.
    #[arg(long, default_value = "1")]
    min_freq: u64,

    /// Max vocab size (non-reserved entries).
    #[arg(long)]
    max_size: Option<usize>,

    /// Output path for the serialized vocabulary.
    #[arg(short, long)]
    output: PathBuf,
}

impl BuildVocabArgs {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging()?;

        let mut options = VocabBuilderOptions::new()
            .with_min_freq(self.min_freq)
            .with_save_path(&self.output);
        if let Some(max_size) = self.max_size {
            options = options.with_max_size(max_size);
        }

        let vocab = match self.field {
            VocabField::Event => build_event_vocab(&self.corpus, &options)?,
            VocabField::Text => build_text_vocab(&self.corpus, &options)?,
        };

        log::info!("Built vocabulary with {} entries", vocab.len());

        Ok(())
    }
}
