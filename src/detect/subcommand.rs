use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use log::info;

use crate::detect::{
    call_edits, check_strand_column, estimate_background, DetectionOptions,
    EditSiteCaller, StreamOptions,
};
use crate::dna::EditType;
use crate::errs::EditError;
use crate::logging::{init_logging_smart, Verbosity};
use crate::position_filter::BlacklistIndex;
use crate::writers::{BackgroundTableWriter, BedWriter, OutWriter, RunMode};

fn strand_column_index(strand_column: usize) -> Result<usize, EditError> {
    strand_column.checked_sub(1).filter(|idx| *idx >= 6).ok_or_else(|| {
        EditError::new_config_error(format!(
            "strand tag column must be after the quality column (7 or \
             greater, 1-based), got {strand_column}"
        ))
    })
}

fn check_inputs_exist(fps: &[PathBuf]) -> anyhow::Result<()> {
    for fp in fps {
        if !fp.exists() {
            bail!(
                "input file {} does not exist",
                fp.to_str().unwrap_or("invalid-UTF-8")
            )
        }
    }
    Ok(())
}

fn make_output(out_path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match out_path {
        Some(fp) => {
            let fh = File::create(fp).context("failed to make output file")?;
            Box::new(BufWriter::new(fh))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    Ok(writer)
}

#[derive(Args)]
pub struct DetectEdits {
    /// Pileup files for the test sample, one per replicate. Each file must
    /// be sorted by chromosome (plain string order) then position. Files
    /// ending in .gz are decompressed.
    #[arg(short = 't', long, required = true, num_args = 1..)]
    test: Vec<PathBuf>,
    /// Pileup files for the control sample, one per replicate. When given,
    /// sites must also be significantly different from the control.
    #[arg(short = 'c', long, num_args = 1..)]
    control: Vec<PathBuf>,
    /// Path to write the BED output to, stdout when omitted.
    #[arg(short = 'o', long)]
    out_path: Option<PathBuf>,
    /// Edit type as reference then edited base, in transcript sense.
    #[arg(short = 'e', long, default_value = "AG")]
    edit: String,
    /// Noise floor added to non-reference bases when testing against the
    /// background.
    #[arg(long, default_value_t = 0.01)]
    detect_noise: f64,
    /// Noise floor added to non-reference bases when comparing test and
    /// control.
    #[arg(long, default_value_t = 0.05)]
    differential_noise: f64,
    /// Score a site must exceed to be reported.
    #[arg(short = 'z', long, default_value_t = 1.96)]
    z_score: f64,
    /// Minimum pooled depth on the edited strand, for both test and control.
    #[arg(long, default_value_t = 10)]
    min_depth: u32,
    /// Minimum depth on the edited strand for every present test replicate.
    #[arg(long, default_value_t = 5)]
    min_rep_depth: u32,
    /// Minimum fraction of edited reads.
    #[arg(long, default_value_t = 0.01)]
    min_edited: f64,
    /// Edited fractions at or above this are treated as SNPs, not edits.
    #[arg(long, default_value_t = 0.95)]
    max_edited: f64,
    /// Minimum number of edited reads.
    #[arg(long, default_value_t = 2)]
    min_alt_depth: u32,
    /// Minimum fold change of the edited fraction between test and control.
    #[arg(long, default_value_t = 2.0)]
    min_fold: f64,
    /// Number of test replicates that must show the edit.
    #[arg(long, default_value_t = 1)]
    reps: usize,
    /// Column (1-based) holding the comma-separated strand tags.
    #[arg(long, default_value_t = 7)]
    strand_column: usize,
    /// Only consider lines starting with this prefix, e.g. a chromosome name.
    #[arg(long)]
    region: Option<String>,
    /// BED files of regions to ignore, may be repeated.
    #[arg(long, action = clap::ArgAction::Append)]
    blacklist: Vec<PathBuf>,
    /// Maximum number of positions used to estimate the background error
    /// rates.
    #[arg(long, default_value_t = 1_000_000, hide_short_help = true)]
    background_sample: usize,
    /// Specify a file for debug logs to be written to.
    #[arg(long, alias = "log")]
    log_filepath: Option<PathBuf>,
    /// Don't log to the console, errors are still reported.
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    /// Log debug messages to the console.
    #[arg(short = 'v', long, default_value_t = false, conflicts_with = "quiet")]
    verbose: bool,
    /// Hide the progress tickers.
    #[arg(long, default_value_t = false, hide_short_help = true)]
    suppress_progress: bool,
}

impl DetectEdits {
    fn detection_options(&self) -> Result<DetectionOptions, EditError> {
        Ok(DetectionOptions {
            edit: EditType::parse_str(&self.edit)?,
            detect_noise: self.detect_noise,
            differential_noise: self.differential_noise,
            z_score: self.z_score,
            min_depth: self.min_depth,
            min_rep_depth: self.min_rep_depth,
            min_edited: self.min_edited,
            max_edited: self.max_edited,
            min_alt_depth: self.min_alt_depth,
            min_fold: self.min_fold,
            reps: self.reps,
        })
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let _handle = init_logging_smart(
            self.log_filepath.as_ref(),
            Verbosity::from_flags(self.quiet, self.verbose),
        )?;
        let suppress_progress = self.suppress_progress || self.quiet;

        let options = self.detection_options()?;
        options.validate(self.test.len())?;
        if self.background_sample == 0 {
            return Err(EditError::new_config_error(
                "background sample must be at least 1 position",
            )
            .into());
        }
        let stream_options = StreamOptions {
            strand_column: strand_column_index(self.strand_column)?,
            region: self.region.clone(),
            background_sample: self.background_sample,
        };
        let inputs = self
            .test
            .iter()
            .chain(self.control.iter())
            .cloned()
            .collect::<Vec<PathBuf>>();
        check_inputs_exist(&inputs)?;
        check_inputs_exist(&self.blacklist)?;
        check_strand_column(&inputs, &stream_options)?;

        let blacklist = if self.blacklist.is_empty() {
            None
        } else {
            Some(BlacklistIndex::from_bed_files(
                &self.blacklist,
                suppress_progress,
            )?)
        };
        let background = estimate_background(
            &self.test,
            &stream_options,
            options.detect_noise,
            suppress_progress,
        )?;
        let reference_background =
            *background.probabilities(options.edit.reference)?;
        info!("detecting {} edits", options.edit);

        let caller = EditSiteCaller::new(
            options,
            reference_background,
            blacklist,
            self.test.len(),
            self.control.len(),
        )?;
        let mode = if caller.is_differential() {
            RunMode::Differential
        } else {
            RunMode::Detect
        };
        let mut writer = BedWriter::new(make_output(self.out_path.as_ref())?, mode)?;
        let n_sites = call_edits(
            &caller,
            &self.test,
            &self.control,
            &stream_options,
            &mut writer,
            suppress_progress,
        )?;
        info!("found {n_sites} significant {mode} edit site(s)");
        Ok(())
    }
}

#[derive(Args)]
pub struct EstimateBackground {
    /// Pileup files for the test sample, one per replicate, sorted by
    /// chromosome then position.
    #[arg(short = 't', long, required = true, num_args = 1..)]
    test: Vec<PathBuf>,
    /// Path to write the table to, stdout when omitted.
    #[arg(short = 'o', long)]
    out_path: Option<PathBuf>,
    /// Noise floor added to non-reference bases.
    #[arg(long, default_value_t = 0.01)]
    detect_noise: f64,
    /// Column (1-based) holding the comma-separated strand tags.
    #[arg(long, default_value_t = 7)]
    strand_column: usize,
    /// Only consider lines starting with this prefix.
    #[arg(long)]
    region: Option<String>,
    /// Maximum number of positions to sample.
    #[arg(long, default_value_t = 1_000_000)]
    background_sample: usize,
    /// Specify a file for debug logs to be written to.
    #[arg(long, alias = "log")]
    log_filepath: Option<PathBuf>,
    /// Don't log to the console, errors are still reported.
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    /// Log debug messages to the console.
    #[arg(short = 'v', long, default_value_t = false, conflicts_with = "quiet")]
    verbose: bool,
    /// Hide the progress ticker.
    #[arg(long, default_value_t = false, hide_short_help = true)]
    suppress_progress: bool,
}

impl EstimateBackground {
    pub fn run(&self) -> anyhow::Result<()> {
        let _handle = init_logging_smart(
            self.log_filepath.as_ref(),
            Verbosity::from_flags(self.quiet, self.verbose),
        )?;
        if !(self.detect_noise.is_finite()
            && self.detect_noise > 0f64
            && self.detect_noise <= 1f64)
        {
            return Err(EditError::new_config_error(format!(
                "detect noise must be in (0, 1], got {}",
                self.detect_noise
            ))
            .into());
        }
        if self.background_sample == 0 {
            return Err(EditError::new_config_error(
                "background sample must be at least 1 position",
            )
            .into());
        }
        let stream_options = StreamOptions {
            strand_column: strand_column_index(self.strand_column)?,
            region: self.region.clone(),
            background_sample: self.background_sample,
        };
        check_inputs_exist(&self.test)?;
        check_strand_column(&self.test, &stream_options)?;

        let model = estimate_background(
            &self.test,
            &stream_options,
            self.detect_noise,
            self.suppress_progress || self.quiet,
        )?;
        let mut writer =
            BackgroundTableWriter::new(make_output(self.out_path.as_ref())?);
        writer.write(&model)?;
        Ok(())
    }
}

#[cfg(test)]
mod subcommand_tests {
    use crate::detect::subcommand::strand_column_index;

    #[test]
    fn test_strand_column_index() {
        assert_eq!(strand_column_index(7).unwrap(), 6);
        assert_eq!(strand_column_index(12).unwrap(), 11);
        assert!(strand_column_index(6).is_err());
        assert!(strand_column_index(0).is_err());
    }
}
