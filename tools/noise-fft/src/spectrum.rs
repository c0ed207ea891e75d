use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::Error;

/// Single-sided amplitude spectrum, positive frequencies only.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Width of one bin in Hz.
    pub resolution: f64,
    pub amplitudes: Vec<f64>,
}

impl Spectrum {
    /// Spectrum of `samples` taken every `interval` seconds.
    ///
    /// Bin `k` of `N` samples lies at `k / (N * interval)` Hz and holds
    /// `2 / N * |X[k]|`, for `k` in `0..N / 2`. The DC bin is scaled the same
    /// way as every other bin.
    pub fn of(samples: &[f64], interval: f64) -> Self {
        let n = samples.len();
        let mut buffer: Vec<Complex<f64>> =
            samples.iter().map(|&v| Complex::new(v, 0.0)).collect();

        FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

        let scale = 2.0 / n as f64;
        Spectrum {
            resolution: 1.0 / (n as f64 * interval),
            amplitudes: buffer[..n / 2].iter().map(|x| scale * x.norm()).collect(),
        }
    }

    /// Element-wise mean of captures taken with the same length and rate.
    pub fn mean(label: &str, spectra: &[Spectrum]) -> Result<Self, Error> {
        let mismatched = || Error::Mismatched(label.to_owned());
        let (first, rest) = spectra.split_first().ok_or_else(mismatched)?;

        let mut sum = first.amplitudes.clone();
        for spectrum in rest {
            let drift = (spectrum.resolution - first.resolution).abs() / first.resolution;
            if spectrum.amplitudes.len() != sum.len() || drift > 1e-6 {
                return Err(mismatched());
            }
            for (total, a) in sum.iter_mut().zip(&spectrum.amplitudes) {
                *total += a;
            }
        }

        let count = spectra.len() as f64;
        Ok(Spectrum {
            resolution: first.resolution,
            amplitudes: sum.into_iter().map(|a| a / count).collect(),
        })
    }

    /// `(frequency in Hz, amplitude)` for every bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.amplitudes
            .iter()
            .enumerate()
            .map(|(k, &a)| (k as f64 * self.resolution, a))
    }
}
