// Cepstral module - decibel conversion and DCT
//
// power_to_db:  db = 10*log10(max(amin, v)) - 10*log10(max(amin, ref)),
//               optionally floored at max(db) - top_db
// dct_ii_ortho: orthonormal DCT-II along the feature (row) axis, keeping the
//               first n_out coefficients

use std::f64::consts::PI;

use super::types::FeatureMatrix;

/// Power floor applied before taking the logarithm
pub const AMIN: f32 = 1e-10;

/// Reference power for the decibel conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DbReference {
    /// Fixed reference power (1.0 gives absolute dB)
    Fixed(f32),
    /// Maximum power in the matrix (output peaks at exactly 0 dB)
    Max,
}

fn to_db(power: f32) -> f32 {
    10.0 * power.max(AMIN).log10()
}

/// Convert a power matrix to decibels
pub fn power_to_db(power: &FeatureMatrix, reference: DbReference, top_db: Option<f32>) -> FeatureMatrix {
    let ref_value = match reference {
        DbReference::Fixed(value) => value,
        DbReference::Max => power.max(),
    };
    // Same expression as the per-element values, so the reference cell maps to exactly 0
    let ref_db = to_db(ref_value);

    let mut data: Vec<f32> = power.data().iter().map(|&v| to_db(v) - ref_db).collect();

    if let Some(top_db) = top_db {
        let floor = data.iter().copied().fold(f32::NEG_INFINITY, f32::max) - top_db;
        for value in &mut data {
            *value = value.max(floor);
        }
    }

    FeatureMatrix::from_raw(power.rows(), power.cols(), data)
}

/// Orthonormal DCT-II basis (n_out x n_in), row k scaled by sqrt(1/N) or sqrt(2/N)
fn dct_basis(n_in: usize, n_out: usize) -> Vec<f32> {
    let n = n_in as f64;
    let mut basis = Vec::with_capacity(n_out * n_in);
    for k in 0..n_out {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        for i in 0..n_in {
            let angle = PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
            basis.push((scale * angle.cos()) as f32);
        }
    }
    basis
}

/// Apply an orthonormal DCT-II down each column and keep `n_out` rows
pub fn dct_ii_ortho(input: &FeatureMatrix, n_out: usize) -> FeatureMatrix {
    let n_in = input.rows();
    let n_out = n_out.min(n_in);
    let basis = dct_basis(n_in, n_out);

    let mut output = FeatureMatrix::zeros(n_out, input.cols());
    for k in 0..n_out {
        let coefficients = &basis[k * n_in..(k + 1) * n_in];
        let out = output.row_mut(k);
        for (i, &c) in coefficients.iter().enumerate() {
            for (acc, &x) in out.iter_mut().zip(input.row(i)) {
                *acc += c * x;
            }
        }
    }
    output
}
