use std::fmt::Display;
use std::io::Write;

use anyhow::Context;
use derive_new::new;

use crate::background::BackgroundModel;
use crate::util::{Strand, TAB};

pub trait OutWriter<T> {
    fn write(&mut self, item: T) -> anyhow::Result<u64>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunMode {
    Detect,
    Differential,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detect => write!(f, "detect"),
            Self::Differential => write!(f, "differential"),
        }
    }
}

/// One called editing site, a BED6 row plus per-replicate summaries in
/// differential mode.
#[derive(new, Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub score: f64,
    pub strand: Strand,
    pub test_summary: Option<String>,
    pub control_summary: Option<String>,
}

impl Display for EditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{TAB}{}{TAB}{}{TAB}{}{TAB}{:.3}{TAB}{}",
            self.chrom,
            self.start,
            self.end,
            self.name,
            self.score,
            self.strand.to_char()
        )?;
        for summary in [&self.test_summary, &self.control_summary]
            .into_iter()
            .flatten()
        {
            write!(f, "{TAB}{summary}")?;
        }
        Ok(())
    }
}

/// Writes a track header, then one flushed line per record so downstream
/// readers can consume the output while the run is in progress.
pub struct BedWriter<W: Write> {
    writer: W,
}

impl<W: Write> BedWriter<W> {
    pub fn new(mut writer: W, mode: RunMode) -> anyhow::Result<Self> {
        writeln!(
            writer,
            "track name=\"edited_{mode}\" description=\"RNA editing sites \
             ({mode} mode)\" useScore=0"
        )
        .context("failed to write BED header")?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutWriter<EditRecord> for BedWriter<W> {
    fn write(&mut self, item: EditRecord) -> anyhow::Result<u64> {
        writeln!(self.writer, "{item}")
            .with_context(|| format!("failed to write record {}", item.name))?;
        self.writer.flush()?;
        Ok(1)
    }
}

pub struct BackgroundTableWriter<W: Write> {
    writer: W,
}

impl<W: Write> BackgroundTableWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutWriter<&BackgroundModel> for BackgroundTableWriter<W> {
    fn write(&mut self, item: &BackgroundModel) -> anyhow::Result<u64> {
        writeln!(self.writer, "ref_base{TAB}A{TAB}C{TAB}G{TAB}T{TAB}n_observations")?;
        write!(self.writer, "{item}")?;
        self.writer.flush()?;
        Ok(4)
    }
}
