//! Stderr logging setup shared by the corpus-pipeline commands.

/// Logging arg group.
///
/// The pipeline commands report progress (counts, save paths) at info
/// level; that is the baseline. `-v` raises it to debug, `-vv` and
/// beyond to trace, and `--quiet` silences stderr entirely.
#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Suppress all log output.
    #[clap(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl LogArgs {
    fn effective_level(&self) -> stderrlog::LogLevelNum {
        match self.verbose {
            0 => stderrlog::LogLevelNum::Info,
            1 => stderrlog::LogLevelNum::Debug,
            _ => stderrlog::LogLevelNum::Trace,
        }
    }

    /// Initialize stderr logging for a command run.
    pub fn setup_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        stderrlog::new()
            .quiet(self.quiet)
            .verbosity(self.effective_level())
            .init()?;

        Ok(())
    }
}
