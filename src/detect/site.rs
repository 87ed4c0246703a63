use itertools::Itertools;
use log::debug;
use log_once::debug_once;

use crate::detect::model::{detection_score, differential_score, scale};
use crate::dna::{DnaBase, EditType};
use crate::errs::EditError;
use crate::pileup::{AggregatePileup, Locus, PileupRecord};
use crate::position_filter::BlacklistIndex;
use crate::util::Strand;
use crate::writers::EditRecord;

/// Thresholds and noise floors for calling editing sites.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOptions {
    pub edit: EditType,
    pub detect_noise: f64,
    pub differential_noise: f64,
    pub z_score: f64,
    pub min_depth: u32,
    pub min_rep_depth: u32,
    pub min_edited: f64,
    pub max_edited: f64,
    pub min_alt_depth: u32,
    pub min_fold: f64,
    pub reps: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            edit: EditType { reference: DnaBase::A, alternate: DnaBase::G },
            detect_noise: 0.01,
            differential_noise: 0.05,
            z_score: 1.96,
            min_depth: 10,
            min_rep_depth: 5,
            min_edited: 0.01,
            max_edited: 0.95,
            min_alt_depth: 2,
            min_fold: 2.0,
            reps: 1,
        }
    }
}

impl DetectionOptions {
    pub fn validate(&self, n_test: usize) -> Result<(), EditError> {
        let in_unit_interval = |x: f64| x.is_finite() && x > 0f64 && x <= 1f64;
        if !in_unit_interval(self.detect_noise) {
            return Err(EditError::new_config_error(format!(
                "detect noise must be in (0, 1], got {}",
                self.detect_noise
            )));
        }
        if !in_unit_interval(self.differential_noise) {
            return Err(EditError::new_config_error(format!(
                "differential noise must be in (0, 1], got {}",
                self.differential_noise
            )));
        }
        if !self.z_score.is_finite() {
            return Err(EditError::new_config_error(format!(
                "z-score threshold must be finite, got {}",
                self.z_score
            )));
        }
        if !(0f64..=1f64).contains(&self.min_edited)
            || !(0f64..=1f64).contains(&self.max_edited)
            || self.min_edited >= self.max_edited
        {
            return Err(EditError::new_config_error(format!(
                "edited fraction bounds must satisfy 0 <= min ({}) < max ({}) \
                 <= 1",
                self.min_edited, self.max_edited
            )));
        }
        if !self.min_fold.is_finite() || self.min_fold < 0f64 {
            return Err(EditError::new_config_error(format!(
                "minimum fold change must be a non-negative number, got {}",
                self.min_fold
            )));
        }
        if n_test == 0 {
            return Err(EditError::new_config_error(
                "at least one test replicate is required",
            ));
        }
        if self.reps == 0 || self.reps > n_test {
            return Err(EditError::new_config_error(format!(
                "replicate agreement must be between 1 and the number of test \
                 replicates ({n_test}), got {}",
                self.reps
            )));
        }
        Ok(())
    }
}

/// Alternate-base count and depth on the edit strand for one replicate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReplicateCounts {
    pub alt: u32,
    pub depth: u32,
}

fn summarize_replicates(replicates: &[Option<ReplicateCounts>]) -> String {
    replicates
        .iter()
        .map(|counts| match counts {
            Some(counts) => format!("{}_{}", counts.alt, counts.depth),
            None => ".".to_string(),
        })
        .join(",")
}

/// A position that passed the potential-edit checks.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub locus: Locus,
    pub strand: Strand,
    pub pooled: AggregatePileup,
    pub replicates: Vec<Option<ReplicateCounts>>,
    pub n_edited: usize,
}

#[derive(Debug, Clone)]
pub struct ControlEvidence {
    pub pooled: AggregatePileup,
    pub replicates: Vec<Option<ReplicateCounts>>,
}

/// Terminal outcome for one aligned position.
#[derive(Debug, Clone)]
pub enum SiteState {
    NotEdit,
    /// Significant against the background, no control data configured.
    SignificantEdit { candidate: Candidate, score: f64 },
    /// Significant against the background and different from the control.
    DifferentialEdit {
        candidate: Candidate,
        control: ControlEvidence,
        score: f64,
    },
}

impl SiteState {
    pub fn is_edit(&self) -> bool {
        !matches!(self, Self::NotEdit)
    }
}

pub struct EditSiteCaller {
    options: DetectionOptions,
    background: [f64; 4],
    blacklist: Option<BlacklistIndex>,
    n_test: usize,
    n_control: usize,
}

impl EditSiteCaller {
    /// `background` is the probability vector for the edit's reference base.
    pub fn new(
        options: DetectionOptions,
        background: [f64; 4],
        blacklist: Option<BlacklistIndex>,
        n_test: usize,
        n_control: usize,
    ) -> Result<Self, EditError> {
        options.validate(n_test)?;
        Ok(Self { options, background, blacklist, n_test, n_control })
    }

    pub fn is_differential(&self) -> bool {
        self.n_control > 0
    }

    pub fn n_inputs(&self) -> usize {
        self.n_test + self.n_control
    }

    /// Strand on which the edit would read, `None` when the reference is not
    /// the edit's reference base or its complement.
    fn edit_strand(&self, reference: Option<DnaBase>) -> Option<Strand> {
        let reference = reference?;
        if reference == self.options.edit.reference {
            Some(Strand::Positive)
        } else if reference == self.options.edit.reference.complement() {
            Some(Strand::Negative)
        } else {
            None
        }
    }

    fn replicate_counts(
        &self,
        pileups: &[Option<PileupRecord>],
        strand: Strand,
    ) -> anyhow::Result<(Vec<Option<AggregatePileup>>, Vec<Option<ReplicateCounts>>)>
    {
        let aggregates = pileups
            .iter()
            .map(|p| p.as_ref().map(AggregatePileup::from_pileup).transpose())
            .collect::<anyhow::Result<Vec<Option<AggregatePileup>>>>()?;
        let counts = aggregates
            .iter()
            .map(|agg| {
                agg.as_ref().map(|agg| ReplicateCounts {
                    alt: agg.count(self.options.edit.alternate, strand),
                    depth: agg.depth(Some(strand)),
                })
            })
            .collect();
        Ok((aggregates, counts))
    }

    /// Checks that run before decoding any alignment columns: reference base,
    /// blacklist and replicate presence.
    fn screen(&self, tests: &[Option<PileupRecord>]) -> Option<(Locus, Strand)> {
        let first = tests.iter().flatten().next()?;
        let strand = self.edit_strand(first.reference())?;
        if self
            .blacklist
            .as_ref()
            .map(|bl| bl.contains_locus(first.locus()))
            .unwrap_or(false)
        {
            debug!("{} is blacklisted", first.locus());
            return None;
        }
        let n_present = tests.iter().flatten().count();
        if n_present < self.options.reps {
            return None;
        }
        Some((first.locus().clone(), strand))
    }

    pub fn potential_edit(
        &self,
        tests: &[Option<PileupRecord>],
    ) -> anyhow::Result<Option<Candidate>> {
        let (locus, strand) = match self.screen(tests) {
            Some(screened) => screened,
            None => return Ok(None),
        };
        let (aggregates, replicates) = self.replicate_counts(tests, strand)?;
        if replicates
            .iter()
            .flatten()
            .any(|counts| counts.depth < self.options.min_rep_depth)
        {
            return Ok(None);
        }
        let pooled = AggregatePileup::sum(aggregates.into_iter().flatten())?;
        if pooled.depth(Some(strand)) < self.options.min_depth {
            return Ok(None);
        }
        if !pooled.is_potential_edit(
            self.options.edit.alternate,
            strand,
            self.options.min_edited,
            self.options.min_alt_depth,
            self.options.max_edited,
        ) {
            return Ok(None);
        }
        let n_edited =
            replicates.iter().flatten().filter(|counts| counts.alt > 0).count();
        if n_edited < self.options.reps {
            return Ok(None);
        }

        Ok(Some(Candidate { locus, strand, pooled, replicates, n_edited }))
    }

    /// Pools the control replicates and applies the depth and fold-change
    /// filters. A control without any alternate reads has an infinite fold.
    pub fn control_evidence(
        &self,
        candidate: &Candidate,
        controls: &[Option<PileupRecord>],
    ) -> anyhow::Result<Option<ControlEvidence>> {
        let (aggregates, replicates) =
            self.replicate_counts(controls, candidate.strand)?;
        let parts = aggregates.into_iter().flatten().collect::<Vec<_>>();
        if parts.is_empty() {
            return Ok(None);
        }
        let pooled = AggregatePileup::sum(parts)?;
        let control_depth = pooled.depth(Some(candidate.strand));
        if control_depth < self.options.min_depth {
            return Ok(None);
        }
        let alt = self.options.edit.alternate;
        let test_fraction = candidate.pooled.count(alt, candidate.strand) as f64
            / candidate.pooled.depth(Some(candidate.strand)) as f64;
        let control_fraction =
            pooled.count(alt, candidate.strand) as f64 / control_depth as f64;
        let fold = test_fraction / control_fraction;
        if fold < self.options.min_fold {
            return Ok(None);
        }

        Ok(Some(ControlEvidence { pooled, replicates }))
    }

    fn replicate_weight(&self, candidate: &Candidate) -> f64 {
        candidate.n_edited as f64 / self.n_test as f64
    }

    pub fn detection_z(&self, candidate: &Candidate) -> Result<f64, EditError> {
        let strand = candidate.strand;
        let depth = candidate.pooled.depth(Some(strand)) as f64;
        let quantiles = candidate.pooled.quantile_vector(strand);
        let test_alphas = scale(
            &candidate.pooled.alpha_vector(strand, self.options.detect_noise),
            depth,
        );
        let background_alphas = scale(&self.background, depth);
        detection_score(
            &quantiles,
            &test_alphas,
            &background_alphas,
            self.replicate_weight(candidate),
        )
    }

    pub fn differential_z(
        &self,
        candidate: &Candidate,
        control: &ControlEvidence,
    ) -> Result<f64, EditError> {
        let strand = candidate.strand;
        let depth = std::cmp::min(
            candidate.pooled.depth(Some(strand)),
            control.pooled.depth(Some(strand)),
        ) as f64;
        let noise = self.options.differential_noise;
        differential_score(
            &candidate.pooled.quantile_vector(strand),
            &scale(&candidate.pooled.alpha_vector(strand, noise), depth),
            &control.pooled.quantile_vector(strand),
            &scale(&control.pooled.alpha_vector(strand, noise), depth),
            self.replicate_weight(candidate),
        )
    }

    /// Numeric failures only make the site non-significant.
    fn passes(&self, score: Result<f64, EditError>, locus: &Locus) -> Option<f64> {
        match score {
            Ok(z) if z > self.options.z_score => Some(z),
            Ok(_) => None,
            Err(e) => {
                debug_once!("numeric failures are treated as not significant");
                debug!("{locus}, {e}");
                None
            }
        }
    }

    /// `tuple` holds the test replicates followed by the control replicates,
    /// `None` where an input has no line for the position.
    pub fn evaluate(
        &self,
        tuple: &[Option<PileupRecord>],
    ) -> anyhow::Result<SiteState> {
        if tuple.len() != self.n_inputs() {
            return Err(EditError::new_alignment_error(format!(
                "expected {} aligned inputs, got {}",
                self.n_inputs(),
                tuple.len()
            ))
            .into());
        }
        let (tests, controls) = tuple.split_at(self.n_test);
        let candidate = match self.potential_edit(tests)? {
            Some(candidate) => candidate,
            None => return Ok(SiteState::NotEdit),
        };
        let control = if self.is_differential() {
            match self.control_evidence(&candidate, controls)? {
                Some(control) => Some(control),
                None => return Ok(SiteState::NotEdit),
            }
        } else {
            None
        };
        let score = match self.passes(self.detection_z(&candidate), &candidate.locus) {
            Some(score) => score,
            None => return Ok(SiteState::NotEdit),
        };

        match control {
            None => Ok(SiteState::SignificantEdit { candidate, score }),
            Some(control) => {
                match self.passes(
                    self.differential_z(&candidate, &control),
                    &candidate.locus,
                ) {
                    Some(score) => {
                        Ok(SiteState::DifferentialEdit { candidate, control, score })
                    }
                    None => Ok(SiteState::NotEdit),
                }
            }
        }
    }

    pub fn to_record(&self, state: SiteState) -> Option<EditRecord> {
        let edit = &self.options.edit;
        let alt = edit.alternate;
        let (candidate, control, score) = match state {
            SiteState::NotEdit => return None,
            SiteState::SignificantEdit { candidate, score } => {
                (candidate, None, score)
            }
            SiteState::DifferentialEdit { candidate, control, score } => {
                (candidate, Some(control), score)
            }
        };
        let strand = candidate.strand;
        let mut name = format!(
            "{edit}_{}_{}",
            candidate.pooled.count(alt, strand),
            candidate.pooled.depth(Some(strand))
        );
        if let Some(control) = control.as_ref() {
            name.push_str(&format!(
                "_{}_{}",
                control.pooled.count(alt, strand),
                control.pooled.depth(Some(strand))
            ));
        }
        let (test_summary, control_summary) = match control {
            Some(control) => (
                Some(summarize_replicates(&candidate.replicates)),
                Some(summarize_replicates(&control.replicates)),
            ),
            None => (None, None),
        };

        Some(EditRecord::new(
            candidate.locus.chrom,
            candidate.locus.position - 1,
            candidate.locus.position,
            name,
            score,
            strand,
            test_summary,
            control_summary,
        ))
    }
}
