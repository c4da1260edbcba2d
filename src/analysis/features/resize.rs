// Resize module - treat a feature matrix as a grayscale float image and
// resample it to a fixed size
//
// Separable convolution resampling: a horizontal pass (time axis) followed
// by a vertical pass (feature axis). When downscaling, the filter support is
// widened by the scale factor so every input pixel contributes (antialiasing).
// Kernel weights are computed in f64 and normalised per output pixel; the
// intermediate image is stored as f32 between the passes. A pass whose input
// and output sizes match is skipped.
//
// This is image interpolation, not signal-domain resampling: both the
// coefficient/mel axis and the time axis are simply stretched or squeezed.

use serde::{Deserialize, Serialize};

use super::types::FeatureMatrix;

/// Interpolation kernel for the image resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Triangle kernel, support 1
    Bilinear,
    /// Cubic convolution kernel with a = -0.5, support 2
    #[default]
    Bicubic,
}

impl ResizeFilter {
    fn support(self) -> f64 {
        match self {
            ResizeFilter::Bilinear => 1.0,
            ResizeFilter::Bicubic => 2.0,
        }
    }

    fn weight(self, x: f64) -> f64 {
        let x = x.abs();
        match self {
            ResizeFilter::Bilinear => {
                if x < 1.0 {
                    1.0 - x
                } else {
                    0.0
                }
            }
            ResizeFilter::Bicubic => {
                const A: f64 = -0.5;
                if x < 1.0 {
                    ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
                } else if x < 2.0 {
                    (((x - 5.0) * x + 8.0) * x - 4.0) * A
                } else {
                    0.0
                }
            }
        }
    }
}

/// Per-output-pixel kernel windows for one axis
struct Kernel {
    /// (first input index, tap count) per output pixel
    bounds: Vec<(usize, usize)>,
    /// Normalised weights, `taps` per output pixel
    weights: Vec<f64>,
    taps: usize,
}

impl Kernel {
    fn new(in_size: usize, out_size: usize, filter: ResizeFilter) -> Self {
        let scale = in_size as f64 / out_size as f64;
        let filter_scale = scale.max(1.0);
        let support = filter.support() * filter_scale;
        let taps = support.ceil() as usize * 2 + 1;

        let mut bounds = Vec::with_capacity(out_size);
        let mut weights = vec![0.0f64; out_size * taps];

        for out in 0..out_size {
            let center = (out as f64 + 0.5) * scale;
            let inv_scale = 1.0 / filter_scale;

            // Truncation toward zero before clamping
            let xmin = ((center - support + 0.5) as i64).max(0) as usize;
            let xmax = ((center + support + 0.5) as i64).min(in_size as i64) as usize;
            let count = xmax.saturating_sub(xmin).min(taps);

            let window = &mut weights[out * taps..out * taps + taps];
            let mut total = 0.0;
            for (x, w) in window.iter_mut().take(count).enumerate() {
                *w = filter.weight((x as f64 + xmin as f64 - center + 0.5) * inv_scale);
                total += *w;
            }
            if total != 0.0 {
                for w in window.iter_mut().take(count) {
                    *w /= total;
                }
            }

            bounds.push((xmin, count));
        }

        Self {
            bounds,
            weights,
            taps,
        }
    }

    /// Resample one strided line of `input` into `output`
    fn apply(&self, out_index: usize, sample: impl Fn(usize) -> f32) -> f32 {
        let (xmin, count) = self.bounds[out_index];
        let window = &self.weights[out_index * self.taps..out_index * self.taps + count];
        let mut acc = 0.0f64;
        for (x, &w) in window.iter().enumerate() {
            acc += sample(xmin + x) as f64 * w;
        }
        acc as f32
    }
}

/// Resize `image` to `out_rows x out_cols`
///
/// The horizontal (column/time) pass runs first, then the vertical
/// (row/feature) pass.
pub fn resize(
    image: &FeatureMatrix,
    out_rows: usize,
    out_cols: usize,
    filter: ResizeFilter,
) -> FeatureMatrix {
    let [in_rows, in_cols] = image.shape();

    let horizontal = if out_cols != in_cols {
        let kernel = Kernel::new(in_cols, out_cols, filter);
        let mut pass = FeatureMatrix::zeros(in_rows, out_cols);
        for row in 0..in_rows {
            let line = image.row(row);
            let out = pass.row_mut(row);
            for (col, value) in out.iter_mut().enumerate() {
                *value = kernel.apply(col, |x| line[x]);
            }
        }
        pass
    } else {
        image.clone()
    };

    if out_rows == in_rows {
        return horizontal;
    }

    let kernel = Kernel::new(in_rows, out_rows, filter);
    let mut output = FeatureMatrix::zeros(out_rows, out_cols);
    for row in 0..out_rows {
        for col in 0..out_cols {
            let value = kernel.apply(row, |y| horizontal.get(y, col));
            output.set(row, col, value);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f32) -> FeatureMatrix {
        let mut m = FeatureMatrix::zeros(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, f(r, c));
            }
        }
        m
    }

    #[test]
    fn test_kernel_weights() {
        let bicubic = ResizeFilter::Bicubic;
        assert_eq!(bicubic.weight(0.0), 1.0);
        assert_eq!(bicubic.weight(1.0), 0.0);
        assert_eq!(bicubic.weight(-2.0), 0.0);
        assert!((bicubic.weight(0.5) - 0.5625).abs() < 1e-12);
        assert!((bicubic.weight(1.5) + 0.0625).abs() < 1e-12);

        let bilinear = ResizeFilter::Bilinear;
        assert_eq!(bilinear.weight(0.25), 0.75);
        assert_eq!(bilinear.weight(-0.25), 0.75);
        assert_eq!(bilinear.weight(1.5), 0.0);
    }

    #[test]
    fn test_output_shape_for_any_input() {
        for (rows, cols) in [(13, 1), (13, 130), (64, 64), (128, 2_000), (1, 1)] {
            let src = image(rows, cols, |r, c| (r * 7 + c) as f32);
            for filter in [ResizeFilter::Bilinear, ResizeFilter::Bicubic] {
                assert_eq!(resize(&src, 64, 64, filter).shape(), [64, 64]);
            }
        }
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let src = image(13, 259, |_, _| -3.5);
        let out = resize(&src, 64, 64, ResizeFilter::Bicubic);
        for &v in out.data() {
            assert!((v + 3.5).abs() < 1e-5, "got {}", v);
        }
    }

    #[test]
    fn test_same_size_is_identity() {
        let src = image(64, 64, |r, c| (r as f32).sin() + c as f32);
        assert_eq!(resize(&src, 64, 64, ResizeFilter::Bicubic), src);
    }

    #[test]
    fn test_single_column_broadcasts_across_width() {
        let src = image(13, 1, |r, _| r as f32);
        let out = resize(&src, 64, 64, ResizeFilter::Bilinear);
        for r in 0..64 {
            let first = out.get(r, 0);
            assert!(out.row(r).iter().all(|&v| v == first));
        }
    }

    #[test]
    fn test_bilinear_upscale_of_ramp_is_monotonic() {
        let src = image(1, 4, |_, c| c as f32);
        let out = resize(&src, 1, 8, ResizeFilter::Bilinear);
        // centre = (x + 0.5) / 2 -> values clamp to the edge pixels
        let expected = [0.0, 0.25, 0.75, 1.25, 1.75, 2.25, 2.75, 3.0];
        for (got, want) in out.row(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {:?}", out.row(0));
        }
    }

    #[test]
    fn test_box_downscale_averages_pairs() {
        // Halving with bilinear widens the triangle to span two pixels each side
        let src = image(1, 8, |_, c| if c % 2 == 0 { 0.0 } else { 2.0 });
        let out = resize(&src, 1, 4, ResizeFilter::Bilinear);
        for &v in &out.row(0)[1..3] {
            assert!((v - 1.0).abs() < 1e-6, "got {:?}", out.row(0));
        }
    }
}
