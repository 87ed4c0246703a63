use std::collections::HashSet;
use std::io::BufRead;
use std::path::PathBuf;

use anyhow::bail;
use log::{debug, info};
use log_once::info_once;
use rust_lapper as lapper;
use rustc_hash::FxHashMap;

use crate::pileup::Locus;
use crate::util::{get_ticker, open_text_reader};

pub(crate) type Iv = lapper::Interval<u64, ()>;
pub(crate) type GenomeIntervals = lapper::Lapper<u64, ()>;

/// Union of 0-based, half-open intervals per chromosome, strand is ignored.
#[derive(Debug, Clone, Default)]
pub struct BlacklistIndex {
    intervals: FxHashMap<String, GenomeIntervals>,
}

impl BlacklistIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `[start, stop)`, merging it with any interval it overlaps.
    pub fn insert(
        &mut self,
        chrom: &str,
        start: u64,
        stop: u64,
    ) -> anyhow::Result<()> {
        if stop <= start {
            bail!("invalid interval {chrom}:{start}-{stop}, stop must be after start")
        }
        let iv = Iv { start, stop, val: () };
        match self.intervals.get_mut(chrom) {
            Some(lp) => {
                lp.insert(iv);
                lp.merge_overlaps();
            }
            None => {
                self.intervals
                    .insert(chrom.to_owned(), GenomeIntervals::new(vec![iv]));
            }
        }
        Ok(())
    }

    /// `position` is 0-based.
    pub fn contains(&self, chrom: &str, position: u64) -> bool {
        self.intervals
            .get(chrom)
            .map(|lp| lp.find(position, position + 1).count() > 0)
            .unwrap_or(false)
    }

    pub fn contains_locus(&self, locus: &Locus) -> bool {
        locus
            .position
            .checked_sub(1)
            .map(|position| self.contains(&locus.chrom, position))
            .unwrap_or(false)
    }

    pub fn n_intervals(&self) -> usize {
        self.intervals.values().map(|lp| lp.intervals.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_intervals() == 0
    }

    pub fn from_bed_files(
        bed_fps: &[PathBuf],
        suppress_pb: bool,
    ) -> anyhow::Result<Self> {
        let mut raw_intervals = FxHashMap::<String, Vec<Iv>>::default();
        let lines_processed = get_ticker(suppress_pb);
        lines_processed.set_message("blacklist rows processed");
        let mut warned = HashSet::new();

        for bed_fp in bed_fps {
            info!(
                "parsing blacklist BED at {}",
                bed_fp.to_str().unwrap_or("invalid-UTF-8")
            );
            let reader = open_text_reader(bed_fp)?;
            for line in
                reader.lines().filter_map(|l| l.ok()).filter(|l| !l.is_empty())
            {
                if line.starts_with('#')
                    || line.starts_with("track")
                    || line.starts_with("browser")
                {
                    continue;
                }
                let parts = line.split_ascii_whitespace().collect::<Vec<&str>>();
                if parts.len() < 3 {
                    info!("improperly formatted BED line, must be BED3+ {line}");
                    continue;
                }
                if parts.len() > 3 {
                    info_once!("ignoring columns past the third in blacklist BED");
                }
                let chrom_name = parts[0];
                let (start, stop) =
                    match (parts[1].parse::<u64>(), parts[2].parse::<u64>()) {
                        (Ok(start), Ok(stop)) if start < stop => (start, stop),
                        _ => {
                            if warned.insert(line.clone()) {
                                info!(
                                    "improperly formatted BED line, failed to \
                                     parse start and/or stop, {line}"
                                );
                            }
                            continue;
                        }
                    };
                raw_intervals
                    .entry(chrom_name.to_owned())
                    .or_insert(Vec::new())
                    .push(Iv { start, stop, val: () });
                lines_processed.inc(1);
            }
        }
        if raw_intervals.is_empty() {
            bail!("zero valid intervals parsed from blacklist BED file(s)")
        }

        let intervals = raw_intervals
            .into_iter()
            .map(|(chrom, intervals)| {
                let mut lp = lapper::Lapper::new(intervals);
                lp.merge_overlaps();
                debug!("{} merged blacklist intervals on {chrom}", lp.intervals.len());
                (chrom, lp)
            })
            .collect::<FxHashMap<String, GenomeIntervals>>();

        lines_processed.finish_and_clear();
        info!("processed {} blacklist BED lines", lines_processed.position());

        Ok(Self { intervals })
    }
}
