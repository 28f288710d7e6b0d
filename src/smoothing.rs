// src/smoothing.rs
use ndarray::Array2;
use thiserror::Error;

/// The first three channels are the accelerometer axes in this device's
/// protocol; only those are ever plotted.
pub const PLOT_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum SmoothError {
    #[error("window length must be odd, got {0}")]
    EvenWindow(usize),
    #[error("polynomial order {order} does not fit in a window of {window}")]
    OrderTooHigh { window: usize, order: usize },
    #[error("window produced a singular projection matrix")]
    Singular,
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("no data to display")]
    NoData,
    #[error("less than 3 columns available for plotting")]
    TooFewChannels,
}

/// Savitzky-Golay smoothing filter.
///
/// Precomputes the least-squares projection matrix over the window's relative
/// positions, so each output point is a fixed linear combination of its
/// neighborhood. Interior points use the center row; the first and last
/// half-windows use the edge rows, which matches fitting a polynomial over
/// each boundary window.
pub struct SavitzkyGolay {
    window: usize,
    projection: Array2<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self, SmoothError> {
        if window % 2 == 0 {
            return Err(SmoothError::EvenWindow(window));
        }
        if order + 1 > window {
            return Err(SmoothError::OrderTooHigh { window, order });
        }
        let half = (window / 2) as isize;
        let design = Array2::from_shape_fn((window, order + 1), |(row, col)| {
            ((row as isize - half) as f64).powi(col as i32)
        });
        let normal = design.t().dot(&design);
        let inverse = invert(&normal).ok_or(SmoothError::Singular)?;
        let projection = design.dot(&inverse).dot(&design.t());
        Ok(Self { window, projection })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Smooths one channel. Inputs shorter than the window are returned
    /// unchanged.
    pub fn smooth(&self, samples: &[f64]) -> Vec<f64> {
        let n = samples.len();
        let window = self.window;
        if n < window {
            return samples.to_vec();
        }
        let half = window / 2;
        let weighted = |row: usize, neighborhood: &[f64]| -> f64 {
            self.projection
                .row(row)
                .iter()
                .zip(neighborhood)
                .map(|(w, s)| w * s)
                .sum()
        };

        let mut out = Vec::with_capacity(n);
        for i in 0..half {
            out.push(weighted(i, &samples[..window]));
        }
        for i in half..n - half {
            out.push(weighted(half, &samples[i - half..=i + half]));
        }
        for i in n - half..n {
            out.push(weighted(window - (n - i), &samples[n - window..]));
        }
        out
    }
}

impl Default for SavitzkyGolay {
    fn default() -> Self {
        Self::new(11, 3).expect("default window and order are valid")
    }
}

/// Gauss-Jordan inverse with partial pivoting. The matrices here are
/// `(order + 1)` square, so nothing fancier is warranted.
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut inv = Array2::eye(n);
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
                inv.swap([col, k], [pivot, k]);
            }
        }
        let scale = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= scale;
            inv[[col, k]] /= scale;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                let lead = a[[col, k]];
                a[[row, k]] -= factor * lead;
                let lead = inv[[col, k]];
                inv[[row, k]] -= factor * lead;
            }
        }
    }
    Some(inv)
}

#[derive(Clone, Debug)]
pub struct PreviewSeries {
    /// acc_x, acc_y, acc_z in plot order.
    pub channels: Vec<Vec<f64>>,
    /// False when the sample was too short for the filter and passed through
    /// raw; the shell reports that as a non-fatal advisory.
    pub smoothed: bool,
}

/// Prepares the first three channels of a stored sample for display.
/// Smoothing is display-only; the stored data is never altered.
pub fn preview(rows: &[Vec<f64>], filter: &SavitzkyGolay) -> Result<PreviewSeries, PreviewError> {
    if rows.is_empty() {
        return Err(PreviewError::NoData);
    }
    if rows.iter().any(|row| row.len() < PLOT_CHANNELS) {
        return Err(PreviewError::TooFewChannels);
    }
    let mut channels: Vec<Vec<f64>> = (0..PLOT_CHANNELS)
        .map(|c| rows.iter().map(|row| row[c]).collect())
        .collect();
    let smoothed = rows.len() >= filter.window();
    if smoothed {
        for channel in &mut channels {
            *channel = filter.smooth(channel);
        }
    }
    Ok(PreviewSeries { channels, smoothed })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{a} != {e}");
        }
    }

    #[test]
    fn rejects_even_window_and_oversized_order() {
        assert!(matches!(
            SavitzkyGolay::new(10, 3),
            Err(SmoothError::EvenWindow(10))
        ));
        assert!(matches!(
            SavitzkyGolay::new(5, 5),
            Err(SmoothError::OrderTooHigh { .. })
        ));
    }

    #[test]
    fn preserves_length() {
        let filter = SavitzkyGolay::default();
        let samples: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin()).collect();
        assert_eq!(filter.smooth(&samples).len(), samples.len());
    }

    #[test]
    fn reproduces_a_cubic_exactly() {
        // an order-3 filter is an identity on polynomials up to degree 3,
        // edges included
        let filter = SavitzkyGolay::new(11, 3).unwrap();
        let samples: Vec<f64> = (0..30)
            .map(|i| {
                let x = i as f64 * 0.1;
                0.5 * x * x * x - 2.0 * x * x + x - 4.0
            })
            .collect();
        assert_close(&filter.smooth(&samples), &samples);
    }

    #[test]
    fn preserves_a_constant_signal() {
        let filter = SavitzkyGolay::default();
        let samples = vec![7.25; 25];
        assert_close(&filter.smooth(&samples), &samples);
    }

    #[test]
    fn short_input_passes_through_unchanged() {
        let filter = SavitzkyGolay::default();
        let samples = vec![1.0, 2.0, 3.0];
        assert_eq!(filter.smooth(&samples), samples);
    }

    #[test]
    fn preview_below_window_skips_smoothing() {
        let filter = SavitzkyGolay::default();
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 0.0, 1.0, 9.0]).collect();
        let series = preview(&rows, &filter).unwrap();
        assert!(!series.smoothed);
        assert_eq!(series.channels.len(), PLOT_CHANNELS);
        assert_eq!(series.channels[0], vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn preview_smooths_only_the_first_three_channels() {
        let filter = SavitzkyGolay::default();
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, 2.0 * i as f64, 3.0, 42.0, 42.0, 42.0])
            .collect();
        let series = preview(&rows, &filter).unwrap();
        assert!(series.smoothed);
        assert_eq!(series.channels.len(), PLOT_CHANNELS);
        // linear and constant channels survive smoothing untouched
        assert_close(
            &series.channels[0],
            &(0..20).map(|i| i as f64).collect::<Vec<_>>(),
        );
        assert_close(&series.channels[2], &vec![3.0; 20]);
    }

    #[test]
    fn preview_rejects_missing_channels_and_empty_input() {
        let filter = SavitzkyGolay::default();
        assert!(matches!(preview(&[], &filter), Err(PreviewError::NoData)));
        let rows = vec![vec![1.0, 2.0]];
        assert!(matches!(
            preview(&rows, &filter),
            Err(PreviewError::TooFewChannels)
        ));
    }
}
