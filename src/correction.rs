//! Multiple-comparison correction (Benjamini–Hochberg FDR)
//!
//! ## Algorithm
//!
//! ```text
//! 1. order p ascending (ties keep input order)
//! 2. q_(i) = p_(i) · m / i
//! 3. running minimum from rank m down to rank 1, capped at 1
//! 4. write q back to the input positions
//! ```
//!
//! The result satisfies `q ≥ p` for every contrast and `q` is non-decreasing
//! in `p` order. A contrast is significant iff `q < alpha`.

use tracing::info;

use crate::config::validate_alpha;
use crate::stats::ContrastResult;
use crate::{Error, Result};

/// Benjamini–Hochberg adjusted p-values, in input order.
///
/// # Example
///
/// ```rust
/// use toolrep::correction::bh_q_values;
///
/// let q = bh_q_values(&[0.01, 0.04, 0.03]);
/// assert!((q[0] - 0.03).abs() < 1e-12);
/// assert!((q[1] - 0.04).abs() < 1e-12);
/// assert!((q[2] - 0.04).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bh_q_values(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]).then(i.cmp(&j)));

    let mut q = vec![1.0; m];
    let mut running = 1.0_f64;
    for (rank0, &index) in order.iter().enumerate().rev() {
        let adjusted = (p_values[index] * m as f64 / (rank0 + 1) as f64).min(1.0);
        running = running.min(adjusted);
        q[index] = running;
    }
    q
}

/// Correct a family of contrast results.
///
/// Returns corrected copies in input order with `q_value` and `significant`
/// set. An empty family yields an empty list.
///
/// # Errors
///
/// - `Error::InvalidConfig` if `alpha` is outside `(0, 1)`
/// - `Error::Computation` if a p-value is not in `[0, 1]`
#[tracing::instrument(skip(results), fields(contrasts = results.len()))]
pub fn correct(results: &[ContrastResult], alpha: f64) -> Result<Vec<ContrastResult>> {
    validate_alpha(alpha)?;
    if let Some(bad) = results.iter().find(|r| !(0.0..=1.0).contains(&r.p_value)) {
        return Err(Error::Computation {
            contrast: bad.contrast_name.clone(),
            message: format!("p-value {} outside [0, 1]", bad.p_value),
        });
    }

    let p_values: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    let corrected: Vec<ContrastResult> = results
        .iter()
        .zip(bh_q_values(&p_values))
        .map(|(result, q)| ContrastResult {
            q_value: Some(q),
            significant: Some(q < alpha),
            ..result.clone()
        })
        .collect();

    info!(
        significant = corrected.iter().filter(|r| r.significant == Some(true)).count(),
        "FDR correction applied"
    );
    Ok(corrected)
}
