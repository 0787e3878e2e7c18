//! Cohort median imputation.
//!
//! A point whose value is missing for a variable (cloud, fill value) takes
//! the median of the valid values of that variable across the whole run.

use wfr_source::{error::AcquisitionError, Variable};

/// Median of a set of values; the mean of the two middle values for even
/// lengths. `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[middle - 1] + sorted[middle]) / 2.0)
    } else {
        Some(sorted[middle])
    }
}

/// Fill every `None` in `values` with the cohort median.
///
/// The median is computed once, from the valid values only, before any
/// entry is filled. Returns the number of filled entries.
pub fn impute_with_median(
    values: &mut [Option<f64>],
    variable: Variable,
) -> Result<usize, AcquisitionError> {
    let valid: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = median(&valid).ok_or(AcquisitionError::AllValuesMissing { variable })?;
    let mut filled = 0;
    for value in values.iter_mut().filter(|value| value.is_none()) {
        *value = Some(fill);
        filled += 1;
    }
    Ok(filled)
}
