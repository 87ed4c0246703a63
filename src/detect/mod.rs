use std::path::PathBuf;

use anyhow::Context;
use log::{debug, info};

use crate::background::BackgroundModel;
use crate::pileup::PileupReader;
use crate::stream_aligner::align_elements;
use crate::util::get_ticker;
use crate::writers::{EditRecord, OutWriter};

mod model;
pub mod site;
pub mod subcommand;

pub use site::{DetectionOptions, EditSiteCaller, SiteState};

/// How to read the pileup inputs.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// 0-based column of the strand tags.
    pub strand_column: usize,
    pub region: Option<String>,
    pub background_sample: usize,
}

pub fn open_streams(
    fps: &[PathBuf],
    stream_options: &StreamOptions,
) -> anyhow::Result<Vec<PileupReader>> {
    fps.iter()
        .map(|fp| {
            PileupReader::open(
                fp,
                stream_options.strand_column,
                stream_options.region.as_deref(),
            )
        })
        .collect()
}

/// Decodes the first covered record of every input so a wrong strand tag
/// column fails the run before any work is done.
pub fn check_strand_column(
    fps: &[PathBuf],
    stream_options: &StreamOptions,
) -> anyhow::Result<()> {
    for (fp, reader) in fps.iter().zip(open_streams(fps, stream_options)?) {
        for record in reader {
            let record = record?;
            if record.reported_depth() == 0 {
                continue;
            }
            record.observations().with_context(|| {
                format!(
                    "failed to decode {}, check the strand tag column ({})",
                    fp.to_str().unwrap_or("invalid-UTF-8"),
                    stream_options.strand_column + 1
                )
            })?;
            break;
        }
    }
    Ok(())
}

pub fn estimate_background(
    test_fps: &[PathBuf],
    stream_options: &StreamOptions,
    detect_noise: f64,
    suppress_progress: bool,
) -> anyhow::Result<BackgroundModel> {
    info!(
        "estimating background error rates from up to {} positions shared by \
         {} test replicate(s)",
        stream_options.background_sample,
        test_fps.len()
    );
    let ticker = get_ticker(suppress_progress);
    ticker.set_message("background positions sampled");
    let model = BackgroundModel::estimate(
        open_streams(test_fps, stream_options)?,
        stream_options.background_sample,
        detect_noise,
        &ticker,
    )?;
    ticker.finish_and_clear();
    info!("sampled {} positions for the background model", model.n_positions());
    Ok(model)
}

/// Walks every position present in any input and writes the called sites,
/// returns the number written.
pub fn call_edits<W: OutWriter<EditRecord>>(
    caller: &EditSiteCaller,
    test_fps: &[PathBuf],
    control_fps: &[PathBuf],
    stream_options: &StreamOptions,
    writer: &mut W,
    suppress_progress: bool,
) -> anyhow::Result<u64> {
    let streams = open_streams(test_fps, stream_options)?
        .into_iter()
        .chain(open_streams(control_fps, stream_options)?)
        .collect::<Vec<PileupReader>>();
    let ticker = get_ticker(suppress_progress);
    ticker.set_message("positions processed");

    let mut n_sites = 0u64;
    for tuple in align_elements(streams) {
        let tuple = tuple?;
        ticker.inc(1);
        let state = caller.evaluate(&tuple)?;
        if let Some(record) = caller.to_record(state) {
            debug!("called {} at {}:{}", record.name, record.chrom, record.end);
            n_sites += writer.write(record)?;
        }
    }
    ticker.finish_and_clear();
    info!("processed {} positions", ticker.position());
    Ok(n_sites)
}
