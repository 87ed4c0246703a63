use std::f64::consts::LN_10;

use rv::prelude::*;

use crate::errs::EditError;

pub(super) fn scale(vector: &[f64; 4], factor: f64) -> [f64; 4] {
    vector.map(|x| x * factor)
}

/// Log density of `quantiles` under Dirichlet(`alphas`). Degenerate inputs
/// (non-positive concentrations, zero quantiles, NaN) are numeric errors.
pub(super) fn dirichlet_ln_pdf(
    quantiles: &[f64; 4],
    alphas: &[f64; 4],
) -> Result<f64, EditError> {
    let dirichlet = Dirichlet::new(alphas.to_vec()).map_err(|e| {
        EditError::new_numeric_error(&format!(
            "invalid concentration {alphas:?}, {e:?}"
        ))
    })?;
    let ln_pdf = dirichlet.ln_f(&quantiles.to_vec());
    if ln_pdf.is_finite() {
        Ok(ln_pdf)
    } else {
        Err(EditError::new_numeric_error(&format!(
            "density of {quantiles:?} under {alphas:?} is {ln_pdf}"
        )))
    }
}

/// log10 likelihood ratio of the observed composition under the sample's
/// own concentration versus the background concentration, weighted by the
/// fraction of replicates that show the edit.
pub(super) fn detection_score(
    quantiles: &[f64; 4],
    test_alphas: &[f64; 4],
    background_alphas: &[f64; 4],
    weight: f64,
) -> Result<f64, EditError> {
    let ln_test = dirichlet_ln_pdf(quantiles, test_alphas)?;
    let ln_background = dirichlet_ln_pdf(quantiles, background_alphas)?;
    finite_log10(ln_test - ln_background, weight)
}

/// log10 of how much better each sample is explained by its own
/// concentration than by the other sample's.
pub(super) fn differential_score(
    test_quantiles: &[f64; 4],
    test_alphas: &[f64; 4],
    control_quantiles: &[f64; 4],
    control_alphas: &[f64; 4],
    weight: f64,
) -> Result<f64, EditError> {
    let matched = dirichlet_ln_pdf(test_quantiles, test_alphas)?
        + dirichlet_ln_pdf(control_quantiles, control_alphas)?;
    let swapped = dirichlet_ln_pdf(control_quantiles, test_alphas)?
        + dirichlet_ln_pdf(test_quantiles, control_alphas)?;
    finite_log10(matched - swapped, weight)
}

#[inline]
fn finite_log10(ln_ratio: f64, weight: f64) -> Result<f64, EditError> {
    let score = ln_ratio / LN_10 * weight;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(EditError::new_numeric_error(&format!("score is {score}")))
    }
}
