use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use anyhow::{anyhow, bail, Context};
use derive_new::new;

use crate::dna::{DnaBase, BASES};
use crate::parsing_utils::{consume_char, consume_digit, consume_field};
use crate::util::Strand;

pub mod aggregate;
mod decode;
pub mod reader;

pub use aggregate::AggregatePileup;
pub use reader::PileupReader;

/// Genomic identity of a pileup, 1-based position. Ordering is a plain
/// string compare on the chromosome, then position.
#[derive(new, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locus {
    pub chrom: String,
    pub position: u64,
}

impl Display for Locus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chrom, self.position)
    }
}

/// Per-strand read evidence. Bases are in transcript sense, reads tagged `-`
/// have already been complemented. `evidence` holds, per base, the sum over
/// reads of the probability that the read supports that base.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct StrandObservations {
    counts: [[u32; 4]; 2],
    evidence: [[f64; 4]; 2],
}

impl StrandObservations {
    pub(crate) fn add_read(
        &mut self,
        strand: Strand,
        base: DnaBase,
        error_prob: f64,
    ) {
        let s = strand.index();
        self.counts[s][base.index()] += 1;
        for other in BASES {
            if other == base {
                self.evidence[s][other.index()] += 1f64 - error_prob;
            } else {
                self.evidence[s][other.index()] += error_prob / 3f64;
            }
        }
    }

    pub(crate) fn combine(&self, other: &Self) -> Self {
        let mut combined = *self;
        for s in 0..2 {
            for b in 0..4 {
                combined.counts[s][b] += other.counts[s][b];
                combined.evidence[s][b] += other.evidence[s][b];
            }
        }
        combined
    }

    pub fn depth(&self, strand: Option<Strand>) -> u32 {
        match strand {
            Some(strand) => self.counts[strand.index()].iter().sum(),
            None => self.counts.iter().flatten().sum(),
        }
    }

    pub fn count(&self, base: DnaBase, strand: Strand) -> u32 {
        self.counts[strand.index()][base.index()]
    }

    pub(crate) fn strand_counts(&self, strand: Strand) -> [u32; 4] {
        self.counts[strand.index()]
    }

    /// Mean per-base evidence on `strand`, sums to 1 when the strand has
    /// reads, all zeros otherwise.
    pub fn mean_evidence(&self, strand: Strand) -> [f64; 4] {
        let depth = self.depth(Some(strand));
        if depth == 0 {
            return [0f64; 4];
        }
        let evidence = &self.evidence[strand.index()];
        BASES.map(|b| evidence[b.index()] / depth as f64)
    }
}

/// One line of pileup text. The identity columns are parsed up front, the
/// alignment columns are decoded the first time observations are needed and
/// cached afterwards.
#[derive(Debug)]
pub struct PileupRecord {
    locus: Locus,
    reference: Option<DnaBase>,
    reported_depth: u64,
    line: String,
    strand_column: usize,
    observations: OnceCell<StrandObservations>,
}

impl PileupRecord {
    /// `strand_column` is the 0-based column holding the strand tags.
    pub fn parse(line: String, strand_column: usize) -> anyhow::Result<Self> {
        let (locus, raw_reference, reported_depth) = {
            let (rest, chrom) = consume_field(&line)
                .map_err(|e| anyhow!("failed to parse chrom, {e}"))?;
            let (rest, position) = consume_digit(rest)
                .map_err(|e| anyhow!("failed to parse position, {e}"))?;
            let (rest, raw_reference) = consume_char(rest)
                .map_err(|e| anyhow!("failed to parse reference base, {e}"))?;
            let (_rest, depth) = consume_digit(rest)
                .map_err(|e| anyhow!("failed to parse depth, {e}"))?;
            (Locus::new(chrom.to_string(), position), raw_reference, depth)
        };
        if locus.position == 0 {
            bail!("pileup positions are 1-based, got 0 at {}", locus.chrom)
        }

        Ok(Self {
            locus,
            reference: DnaBase::parse_reference(raw_reference),
            reported_depth,
            line,
            strand_column,
            observations: OnceCell::new(),
        })
    }

    pub fn locus(&self) -> &Locus {
        &self.locus
    }

    pub fn chrom(&self) -> &str {
        &self.locus.chrom
    }

    pub fn position(&self) -> u64 {
        self.locus.position
    }

    /// `None` when the reference is `N`.
    pub fn reference(&self) -> Option<DnaBase> {
        self.reference
    }

    pub fn reported_depth(&self) -> u64 {
        self.reported_depth
    }

    pub fn is_decoded(&self) -> bool {
        self.observations.get().is_some()
    }

    pub fn observations(&self) -> anyhow::Result<&StrandObservations> {
        if let Some(observations) = self.observations.get() {
            return Ok(observations);
        }
        let observations = decode::decode_observations(
            &self.line,
            self.reference,
            self.reported_depth,
            self.strand_column,
        )
        .with_context(|| format!("failed to decode pileup at {}", self.locus))?;
        Ok(self.observations.get_or_init(|| observations))
    }
}

impl Display for PileupRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.locus)
    }
}

impl PartialEq for PileupRecord {
    fn eq(&self, other: &Self) -> bool {
        self.locus == other.locus
    }
}

impl Eq for PileupRecord {}

impl PartialOrd for PileupRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PileupRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.locus.cmp(&other.locus)
    }
}
