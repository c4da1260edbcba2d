//! Grayscale plots of feature matrices.
//!
//! Matrices are written as binary PGM (P5) images: one pixel per cell,
//! time running left to right and the lowest band or coefficient on the
//! bottom row. Values are min-max scaled to 0..=255; a constant matrix
//! renders black.

use std::fs;
use std::io;
use std::path::Path;

use crate::analysis::features::FeatureMatrix;

/// Encode a matrix as an 8-bit binary PGM image.
pub fn to_pgm(matrix: &FeatureMatrix) -> Vec<u8> {
    let [rows, cols] = matrix.shape();
    let header = format!("P5\n{} {}\n255\n", cols, rows);

    let min = matrix.min();
    let range = matrix.max() - min;
    let scale = if range > 0.0 && range.is_finite() {
        255.0 / range
    } else {
        0.0
    };

    let mut out = Vec::with_capacity(header.len() + rows * cols);
    out.extend_from_slice(header.as_bytes());
    for row in (0..rows).rev() {
        out.extend(
            matrix
                .row(row)
                .iter()
                .map(|&v| ((v - min) * scale).round().clamp(0.0, 255.0) as u8),
        );
    }
    out
}

/// Write a matrix to `path` as a PGM image.
pub fn write_pgm(path: &Path, matrix: &FeatureMatrix) -> io::Result<()> {
    fs::write(path, to_pgm(matrix))?;
    log::debug!(
        "[Render] Wrote {}x{} plot to {:?}",
        matrix.cols(),
        matrix.rows(),
        path
    );
    Ok(())
}
