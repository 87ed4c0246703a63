use clap::Subcommand;

use crate::detect::subcommand::{DetectEdits, EstimateBackground};

#[derive(Subcommand)]
pub enum Commands {
    /// Detect RNA editing sites in sorted pileup files. Sites are tested
    /// against a background error model estimated from the test data and,
    /// when control files are given, against the control sample. Produces a
    /// BED file with one line per significant site.
    Detect(DetectEdits),
    /// Estimate the background error model only, writes a table with the
    /// probability of observing each base given the reference base.
    Background(EstimateBackground),
}

impl Commands {
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Detect(x) => x.run(),
            Self::Background(x) => x.run(),
        }
    }
}
