use anyhow::bail;

use crate::dna::{DnaBase, BASES};
use crate::errs::EditError;
use crate::pileup::{Locus, PileupRecord, StrandObservations};
use crate::util::Strand;

/// Minimum depth on the opposite strand, as a fraction of the edited
/// strand's depth (floored), for a site to be considered.
const OPPOSITE_STRAND_FRACTION: f64 = 0.025;

/// The pooled evidence of one or more pileups at the same locus.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatePileup {
    locus: Locus,
    reference: Option<DnaBase>,
    observations: StrandObservations,
    n_pileups: usize,
}

impl AggregatePileup {
    pub fn from_pileup(pileup: &PileupRecord) -> anyhow::Result<Self> {
        Ok(Self {
            locus: pileup.locus().clone(),
            reference: pileup.reference(),
            observations: *pileup.observations()?,
            n_pileups: 1,
        })
    }

    pub fn from_pileups(pileups: &[&PileupRecord]) -> anyhow::Result<Self> {
        let parts = pileups
            .iter()
            .map(|p| Self::from_pileup(p))
            .collect::<anyhow::Result<Vec<Self>>>()?;
        Self::sum(parts)
    }

    /// Sums the parts, all of which must share the same locus.
    pub fn sum<I: IntoIterator<Item = Self>>(parts: I) -> anyhow::Result<Self> {
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(first) => first,
            None => bail!("cannot sum an empty set of pileups"),
        };
        parts.try_fold(first, |acc, part| acc.combine(&part))
    }

    fn combine(self, other: &Self) -> anyhow::Result<Self> {
        if self.locus != other.locus {
            return Err(EditError::new_alignment_error(format!(
                "attempted to combine pileups at different positions, {} and \
                 {}, are the replicate files sorted the same way?",
                self.locus, other.locus
            ))
            .into());
        }
        Ok(Self {
            locus: self.locus,
            reference: self.reference,
            observations: self.observations.combine(&other.observations),
            n_pileups: self.n_pileups + other.n_pileups,
        })
    }

    pub fn locus(&self) -> &Locus {
        &self.locus
    }

    pub fn reference(&self) -> Option<DnaBase> {
        self.reference
    }

    pub fn n_pileups(&self) -> usize {
        self.n_pileups
    }

    pub fn depth(&self, strand: Option<Strand>) -> u32 {
        self.observations.depth(strand)
    }

    pub fn count(&self, base: DnaBase, strand: Strand) -> u32 {
        self.observations.count(base, strand)
    }

    pub(crate) fn strand_counts(&self, strand: Strand) -> [u32; 4] {
        self.observations.strand_counts(strand)
    }

    /// Reference base as it reads on `strand`.
    pub fn strand_reference(&self, strand: Strand) -> Option<DnaBase> {
        self.reference.map(|base| match strand {
            Strand::Positive => base,
            Strand::Negative => base.complement(),
        })
    }

    pub fn is_potential_edit(
        &self,
        alt_base: DnaBase,
        strand: Strand,
        min_edited_fraction: f64,
        min_alt_depth: u32,
        max_edited_fraction: f64,
    ) -> bool {
        let depth = self.depth(Some(strand));
        let alt_count = self.count(alt_base, strand);
        let lower = std::cmp::max(
            (depth as f64 * min_edited_fraction).ceil() as u32,
            min_alt_depth,
        );
        let upper = (depth as f64 * max_edited_fraction).ceil() as u32;
        let opposite_depth = self.depth(Some(strand.opposite()));
        let min_opposite =
            (depth as f64 * OPPOSITE_STRAND_FRACTION).floor() as u32;

        alt_count >= lower && alt_count < upper && opposite_depth >= min_opposite
    }

    /// Dirichlet concentration (before scaling by depth): the mean evidence
    /// plus `noise / 3` on every non-reference base.
    pub fn alpha_vector(&self, strand: Strand, noise: f64) -> [f64; 4] {
        let reference = self.strand_reference(strand);
        let quantiles = self.quantile_vector(strand);
        BASES.map(|base| {
            let floor =
                if Some(base) == reference { 0f64 } else { noise / 3f64 };
            floor + quantiles[base.index()]
        })
    }

    pub fn quantile_vector(&self, strand: Strand) -> [f64; 4] {
        self.observations.mean_evidence(strand)
    }
}

#[cfg(test)]
mod aggregate_tests {
    use assert_approx_eq::assert_approx_eq;

    use crate::dna::DnaBase;
    use crate::errs::EditError;
    use crate::pileup::{AggregatePileup, PileupRecord};
    use crate::test_utils::{pileup_line, STRAND_COLUMN};
    use crate::util::Strand;

    fn aggregate(pos: u64, mapping: &str, tags: &str) -> AggregatePileup {
        let line = pileup_line("chr1", pos, 'A', mapping, tags);
        let record = PileupRecord::parse(line, STRAND_COLUMN).unwrap();
        AggregatePileup::from_pileup(&record).unwrap()
    }

    #[test]
    fn test_sum_adds_depths_and_is_order_independent() {
        let a = aggregate(5, "..GG,", "++++-");
        let b = aggregate(5, ".G,,c", "++--+");
        let ab = AggregatePileup::sum(vec![a.clone(), b.clone()]).unwrap();
        let ba = AggregatePileup::sum(vec![b.clone(), a.clone()]).unwrap();
        assert_eq!(ab.depth(None), a.depth(None) + b.depth(None));
        assert_eq!(ab, ba);
        assert_eq!(ab.n_pileups(), 2);
        for strand in [Strand::Positive, Strand::Negative] {
            assert_eq!(
                ab.count(DnaBase::G, strand),
                a.count(DnaBase::G, strand) + b.count(DnaBase::G, strand)
            );
        }
    }

    #[test]
    fn test_sum_rejects_mismatched_loci_and_empty_input() {
        let a = aggregate(5, "..", "++");
        let b = aggregate(6, "..", "++");
        let err = AggregatePileup::sum(vec![a, b]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EditError>(),
            Some(EditError::InputAlignment(_))
        ));
        assert!(AggregatePileup::sum(Vec::new()).is_err());
    }

    #[test]
    fn test_is_potential_edit_bounds() {
        // 12 reference, 8 G on the forward strand
        let agg = aggregate(1, "............GGGGGGGG", "++++++++++++++++++++");
        assert!(agg.is_potential_edit(DnaBase::G, Strand::Positive, 0.01, 2, 0.95));
        // 50% required
        assert!(!agg.is_potential_edit(DnaBase::G, Strand::Positive, 0.5, 2, 0.95));
        // upper bound is exclusive, ceil(20 * 0.4) = 8
        assert!(!agg.is_potential_edit(DnaBase::G, Strand::Positive, 0.01, 2, 0.4));
        assert!(!agg.is_potential_edit(DnaBase::G, Strand::Positive, 0.01, 9, 0.95));
        assert!(!agg.is_potential_edit(DnaBase::C, Strand::Positive, 0.01, 2, 0.95));
    }

    #[test]
    fn test_opposite_strand_guard() {
        // 40 forward reads needs at least floor(40 * 0.025) = 1 reverse read
        let forward_only = aggregate(1, &format!("{}{}", ".".repeat(30), "G".repeat(10)), &"+".repeat(40));
        assert!(!forward_only.is_potential_edit(DnaBase::G, Strand::Positive, 0.01, 2, 0.95));
        let with_reverse = aggregate(
            1,
            &format!("{}{},", ".".repeat(30), "G".repeat(10)),
            &format!("{}-", "+".repeat(40)),
        );
        assert!(with_reverse.is_potential_edit(DnaBase::G, Strand::Positive, 0.01, 2, 0.95));
    }

    #[test]
    fn test_alpha_and_quantile_vectors() {
        let agg = aggregate(1, "..G,", "+++-");
        let quantiles = agg.quantile_vector(Strand::Positive);
        let alphas = agg.alpha_vector(Strand::Positive, 0.03);
        assert_approx_eq!(quantiles.iter().sum::<f64>(), 1f64, 1e-9);
        // reference slot gets no noise
        assert_approx_eq!(alphas[DnaBase::A.index()], quantiles[DnaBase::A.index()], 1e-12);
        for base in [DnaBase::C, DnaBase::G, DnaBase::T] {
            assert_approx_eq!(alphas[base.index()], quantiles[base.index()] + 0.01, 1e-12);
        }
        // on the reverse strand the reference reads as T
        let alphas = agg.alpha_vector(Strand::Negative, 0.03);
        let quantiles = agg.quantile_vector(Strand::Negative);
        assert_approx_eq!(alphas[DnaBase::T.index()], quantiles[DnaBase::T.index()], 1e-12);
        assert_approx_eq!(alphas[DnaBase::A.index()], quantiles[DnaBase::A.index()] + 0.01, 1e-12);
    }
}
