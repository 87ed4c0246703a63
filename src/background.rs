use std::fmt::Display;

use anyhow::anyhow;
use indicatif::ProgressBar;
use log::{debug, info};
use log_once::debug_once;
use rustc_hash::FxHashMap;

use crate::dna::{DnaBase, BASES};
use crate::monoid::{BaseCounts, Moniod};
use crate::pileup::{AggregatePileup, PileupRecord};
use crate::stream_aligner::shared_elements;
use crate::util::Strand;

/// Per reference base, the probability of observing each base (A, C, G, T)
/// estimated from a bounded sample of the test data.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundModel {
    probabilities: FxHashMap<DnaBase, [f64; 4]>,
    tallies: FxHashMap<DnaBase, BaseCounts>,
    n_positions: usize,
}

impl BackgroundModel {
    /// Walks positions shared by every test replicate, at most `cap` of them.
    /// Forward-strand reads are tallied under the reference base, reverse
    /// strand reads (already complemented) under its complement.
    pub fn estimate<I>(
        streams: Vec<I>,
        cap: usize,
        detect_noise: f64,
        ticker: &ProgressBar,
    ) -> anyhow::Result<Self>
    where
        I: Iterator<Item = anyhow::Result<PileupRecord>>,
    {
        let mut n_positions = 0usize;
        let tallies = shared_elements(streams).take(cap).try_fold(
            FxHashMap::<DnaBase, BaseCounts>::zero(),
            |mut tallies, tuple| -> anyhow::Result<_> {
                let tuple = tuple?;
                n_positions += 1;
                ticker.inc(1);
                let reference = match tuple.first().and_then(|p| p.reference()) {
                    Some(reference) => reference,
                    None => {
                        debug_once!("skipping positions with reference N");
                        return Ok(tallies);
                    }
                };
                let pooled = AggregatePileup::from_pileups(
                    &tuple.iter().collect::<Vec<&PileupRecord>>(),
                )?;
                tallies.op_mut(FxHashMap::from_iter([
                    (
                        reference,
                        BaseCounts::from(pooled.strand_counts(Strand::Positive)),
                    ),
                    (
                        reference.complement(),
                        BaseCounts::from(pooled.strand_counts(Strand::Negative)),
                    ),
                ]));
                Ok(tallies)
            },
        )?;
        if n_positions >= cap {
            info!("background sample reached the cap of {cap} positions");
        }
        let model = Self::from_tallies(tallies, detect_noise, n_positions);
        debug!("background model\n{}", model);
        Ok(model)
    }

    /// Normalizes tallies after adding `noise / 3` to every non-reference
    /// slot. Bases without any observation are left out of the model.
    pub fn from_tallies(
        tallies: FxHashMap<DnaBase, BaseCounts>,
        noise: f64,
        n_positions: usize,
    ) -> Self {
        let probabilities = tallies
            .iter()
            .filter(|(_, counts)| counts.total() > 0)
            .map(|(reference, counts)| {
                let noisy = BASES.map(|base| {
                    let floor =
                        if base == *reference { 0f64 } else { noise / 3f64 };
                    counts.0[base.index()] as f64 + floor
                });
                let total = noisy.iter().sum::<f64>();
                (*reference, noisy.map(|x| x / total))
            })
            .collect::<FxHashMap<DnaBase, [f64; 4]>>();

        Self { probabilities, tallies, n_positions }
    }

    /// Fails when `reference` was never observed in the sample, the model
    /// can't be used for that edit type.
    pub fn probabilities(&self, reference: DnaBase) -> anyhow::Result<&[f64; 4]> {
        self.probabilities.get(&reference).ok_or_else(|| {
            anyhow!(
                "no reads over reference base {reference} in the {} background \
                 positions sampled, need more coverage to estimate the \
                 background error rate",
                self.n_positions
            )
        })
    }

    pub fn observations(&self, reference: DnaBase) -> u64 {
        self.tallies.get(&reference).map(|c| c.total()).unwrap_or(0)
    }

    pub fn n_positions(&self) -> usize {
        self.n_positions
    }
}

impl Display for BackgroundModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for reference in BASES {
            match self.probabilities.get(&reference) {
                Some(probs) => writeln!(
                    f,
                    "{reference}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}",
                    probs[0],
                    probs[1],
                    probs[2],
                    probs[3],
                    self.observations(reference)
                )?,
                None => writeln!(f, "{reference}\t.\t.\t.\t.\t0")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod background_tests {
    use std::io::Cursor;

    use assert_approx_eq::assert_approx_eq;
    use indicatif::ProgressBar;

    use crate::background::BackgroundModel;
    use crate::dna::{DnaBase, BASES};
    use crate::pileup::PileupReader;
    use crate::test_utils::{pileup_line, STRAND_COLUMN};

    fn reader(lines: &[String]) -> PileupReader {
        let text = lines.join("\n");
        PileupReader::from_reader(
            "test".to_string(),
            Box::new(Cursor::new(text.into_bytes())),
            STRAND_COLUMN,
            None,
        )
    }

    #[test]
    fn test_estimate_pools_strands() {
        let rep_a = vec![
            pileup_line("chr1", 1, 'A', "...G", "++++"),
            pileup_line("chr1", 2, 'N', "..", "++"),
            // reverse reads over a T reference count toward A
            pileup_line("chr1", 3, 'T', ",,c", "---"),
            pileup_line("chr1", 4, 'C', "..", "++"),
        ];
        let rep_b = vec![
            pileup_line("chr1", 1, 'A', "..", "++"),
            pileup_line("chr1", 3, 'T', ",", "-"),
        ];
        let model = BackgroundModel::estimate(
            vec![reader(&rep_a), reader(&rep_b)],
            1_000,
            0.03,
            &ProgressBar::hidden(),
        )
        .unwrap();
        // positions 1 and 3 are shared, the rest is ignored
        assert_eq!(model.n_positions(), 2);
        // A: 3 + 2 + 2 + 1 reference reads, 2 G (one forward, one reverse)
        assert_eq!(model.observations(DnaBase::A), 10);
        let probs = model.probabilities(DnaBase::A).unwrap();
        let total = 10f64 + 0.03;
        assert_approx_eq!(probs[0], 8f64 / total, 1e-12);
        assert_approx_eq!(probs[1], 0.01 / total, 1e-12);
        assert_approx_eq!(probs[2], 2.01 / total, 1e-12);
        assert_approx_eq!(probs[3], 0.01 / total, 1e-12);
        assert!(model.probabilities(DnaBase::C).is_err());
    }

    #[test]
    fn test_cap_bounds_sample() {
        let lines = (1..=50)
            .map(|pos| pileup_line("chr1", pos, 'G', "..", "++"))
            .collect::<Vec<String>>();
        let model = BackgroundModel::estimate(
            vec![reader(&lines)],
            10,
            0.01,
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(model.n_positions(), 10);
        assert_eq!(model.observations(DnaBase::G), 20);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let lines = vec![
            pileup_line("chr1", 1, 'A', "..GTc,", "+++++-"),
            pileup_line("chr1", 2, 'C', ".,AT", "+-+-"),
            pileup_line("chr1", 3, 'G', "..,a", "+--+"),
            pileup_line("chr1", 4, 'T', ".G,", "++-"),
        ];
        let model = BackgroundModel::estimate(
            vec![reader(&lines)],
            1_000,
            0.01,
            &ProgressBar::hidden(),
        )
        .unwrap();
        for base in BASES {
            let probs = model.probabilities(base).unwrap();
            assert!((probs.iter().sum::<f64>() - 1f64).abs() < 1e-9);
            assert!(probs.iter().all(|p| *p > 0f64));
        }
        assert!(model.to_string().lines().count() == 4);
    }
}
