//! Per-class cumulative distribution of a single feature.

use serde::Serialize;

use crate::ModelError;

/// Fraction of each class at or below `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CumulativePoint {
    /// Distinct feature value.
    pub value: f64,
    /// Share of class-0 samples with feature `<= value`.
    pub class_0: f64,
    /// Share of class-1 samples with feature `<= value`.
    pub class_1: f64,
}

/// Build the cumulative class distribution of one feature column.
///
/// Samples are sorted by value (stable), both classes are accumulated and
/// normalized by their totals, and only the last point of each distinct value
/// is kept. The final point is always `(max, 1.0, 1.0)`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::EmptyInput`] | Zero samples |
/// | [`ModelError::LengthMismatch`] | `values.len() != labels.len()` |
/// | [`ModelError::NonBinaryLabel`] | A label is not 0 or 1 |
/// | [`ModelError::NonFiniteValue`] | A value is NaN or infinite |
/// | [`ModelError::MissingClass`] | One class has no samples |
pub fn cumulative_distribution(
    values: &[f64],
    labels: &[usize],
) -> Result<Vec<CumulativePoint>, ModelError> {
    if labels.len() != values.len() {
        return Err(ModelError::LengthMismatch {
            left: labels.len(),
            right: values.len(),
        });
    }
    if labels.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    crate::confusion::check_binary(labels)?;
    if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteValue {
            sample_index,
            feature_index: 0,
        });
    }

    let n_pos = labels.iter().filter(|&&y| y == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_neg == 0 {
        return Err(ModelError::MissingClass { class: 0 });
    }
    if n_pos == 0 {
        return Err(ModelError::MissingClass { class: 1 });
    }

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut points: Vec<CumulativePoint> = Vec::new();
    let (mut seen_neg, mut seen_pos) = (0usize, 0usize);
    for &i in &order {
        if labels[i] == 1 {
            seen_pos += 1;
        } else {
            seen_neg += 1;
        }
        let point = CumulativePoint {
            value: values[i],
            class_0: seen_neg as f64 / n_neg as f64,
            class_1: seen_pos as f64 / n_pos as f64,
        };
        match points.last_mut() {
            Some(last) if last.value == point.value => *last = point,
            _ => points.push(point),
        }
    }

    Ok(points)
}
