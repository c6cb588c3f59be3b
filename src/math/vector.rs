//! Row-major vector helpers over `Vec<Vec<f64>>` datasets.

use crate::error::{EstimateError, EstimateResult};

/// Common dimension of all rows.
///
/// Errors on an empty dataset, zero-width rows, or ragged rows.
pub fn row_dimension(rows: &[Vec<f64>]) -> EstimateResult<usize> {
    let first = rows
        .first()
        .ok_or_else(|| EstimateError::invalid("dataset must contain at least one sample"))?;
    let d = first.len();
    if d == 0 {
        return Err(EstimateError::invalid("samples must have dimension >= 1"));
    }
    if let Some(bad) = rows.iter().find(|row| row.len() != d) {
        return Err(EstimateError::DimensionMismatch {
            what: "sample dimension",
            expected: d,
            found: bad.len(),
        });
    }
    Ok(d)
}

/// Errors if any entry is NaN or infinite.
pub fn ensure_finite_rows(rows: &[Vec<f64>], what: &str) -> EstimateResult<()> {
    match rows
        .iter()
        .position(|row| row.iter().any(|v| !v.is_finite()))
    {
        Some(i) => Err(EstimateError::invalid(format!(
            "{what} row {i} has a non-finite entry"
        ))),
        None => Ok(()),
    }
}

/// `z_i = x_i * y_i`, row by row, preserving order.
///
/// Lengths must agree exactly; nothing is truncated. Inputs must be finite and
/// so must every product.
pub fn elementwise_products(x: &[Vec<f64>], y: &[f64]) -> EstimateResult<Vec<Vec<f64>>> {
    if x.len() != y.len() {
        return Err(EstimateError::DimensionMismatch {
            what: "x/y length",
            expected: x.len(),
            found: y.len(),
        });
    }
    row_dimension(x)?;
    ensure_finite_rows(x, "x")?;
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(EstimateError::invalid(format!("y[{i}] is not finite")));
    }

    let z: Vec<Vec<f64>> = x
        .iter()
        .zip(y)
        .map(|(row, &yi)| row.iter().map(|xij| xij * yi).collect())
        .collect();
    ensure_finite_rows(&z, "x*y product")?;
    Ok(z)
}

pub fn squared_norm(v: &[f64]) -> f64 {
    v.iter().map(|a| a * a).sum()
}

/// Euclidean norm, scaled by the largest magnitude so that it does not overflow
/// for finite input.
pub fn euclidean_norm(v: &[f64]) -> f64 {
    let scale = v.iter().fold(0.0_f64, |m, a| m.max(a.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    scale * v.iter().map(|a| (a / scale).powi(2)).sum::<f64>().sqrt()
}

/// Project `point` onto the ball `B(center, radius)` in place; true if it moved.
///
/// Offsets are halved and scaled by their largest magnitude, so a far-away
/// finite point lands on the surface instead of overflowing.
pub fn clip_to_ball(point: &mut [f64], center: &[f64], radius: f64) -> bool {
    let half = |p: f64, c: f64| 0.5 * p - 0.5 * c;
    let scale = point
        .iter()
        .zip(center)
        .fold(0.0_f64, |m, (p, c)| m.max(half(*p, *c).abs()));
    if scale == 0.0 {
        return false;
    }
    let unit_norm = point
        .iter()
        .zip(center)
        .map(|(p, c)| (half(*p, *c) / scale).powi(2))
        .sum::<f64>()
        .sqrt();
    // Distance is `2 * scale * unit_norm`.
    if scale <= 0.5 * radius / unit_norm {
        return false;
    }
    let factor = radius / unit_norm;
    for (p, c) in point.iter_mut().zip(center) {
        *p = c + half(*p, *c) / scale * factor;
    }
    true
}

pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

pub fn scale_rows(rows: &mut [Vec<f64>], factor: f64) {
    for row in rows.iter_mut() {
        for v in row.iter_mut() {
            *v *= factor;
        }
    }
}

/// Coordinate-wise mean of equally-sized rows.
pub fn column_mean(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut acc = vec![0.0; first.len()];
    for row in rows {
        for (a, v) in acc.iter_mut().zip(row) {
            *a += v;
        }
    }
    let n = rows.len() as f64;
    acc.iter_mut().for_each(|a| *a /= n);
    acc
}
