use std::path::PathBuf;

use chaincast::corpus::{for_each_instance, tokenize_text};
use chaincast::vocab::VocabCounter;

use crate::logging::LogArgs;

/// Args for the stats command.
#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Corpus file (JSONL).
    corpus: PathBuf,

    #[clap(flatten)]
    pub logging: LogArgs,
}

impl StatsArgs {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging()?;

        let mut instances = 0usize;
        let mut context_events = 0usize;
        let mut max_context = 0usize;
        let mut events = VocabCounter::new();
        let mut tokens = VocabCounter::new();

        for_each_instance(&self.corpus, |record| {
            instances += 1;
            events.update(&record.e1);
            events.update(&record.e2);
            for token in tokenize_text(&record.e1_text) {
                tokens.update(&token);
            }
            context_events += record.e1prev_intext.len();
            max_context = max_context.max(record.e1prev_intext.len());
        })?;

        println!("instances: {instances}");
        println!("distinct events: {}", events.distinct());
        println!("distinct text tokens: {}", tokens.distinct());
        if instances > 0 {
            println!(
                "mean context events: {:.2}",
                context_events as f64 / instances as f64
            );
        }
        println!("max context events: {max_context}");

        Ok(())
    }
}
