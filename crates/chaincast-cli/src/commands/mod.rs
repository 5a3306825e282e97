use crate::commands::{build_vocab::BuildVocabArgs, stats::StatsArgs};

pub mod build_vocab;
pub mod stats;

/// Subcommands for chaincast-cli
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build an event or text vocabulary from a corpus.
    BuildVocab(BuildVocabArgs),

    /// Summarize a corpus.
    Stats(StatsArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::BuildVocab(cmd) => cmd.run(),
            Commands::Stats(cmd) => cmd.run(),
        }
    }
}
