/// Half-open range of FFT bin indices, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    pub min: usize,
    pub max: usize,
}

impl BinRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn len(&self) -> usize {
        self.max.saturating_sub(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }
}

fn check_range(len: usize, range: BinRange) {
    assert!(
        range.min < range.max && range.max <= len,
        "bin range [{}, {}) out of bounds for {} bins",
        range.min,
        range.max,
        len
    );
}

/// Spectral flux between two consecutive magnitude spectra over `range`.
///
/// Only increases in magnitude contribute (half-wave rectification), so the
/// result is never negative. Panics if the spectra differ in length or the
/// range is empty or out of bounds.
pub fn spectral_flux(current: &[f32], previous: &[f32], range: BinRange) -> f32 {
    assert_eq!(
        current.len(),
        previous.len(),
        "spectrum length changed between ticks"
    );
    check_range(current.len(), range);

    current[range.min..range.max]
        .iter()
        .zip(&previous[range.min..range.max])
        .map(|(c, p)| {
            let diff = c - p;
            (diff + diff.abs()) * 0.5
        })
        .sum()
}

/// Mean magnitude over `range`.
pub fn band_average(spectrum: &[f32], range: BinRange) -> f32 {
    check_range(spectrum.len(), range);
    let sum: f32 = spectrum[range.min..range.max].iter().sum();
    sum / range.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_spectra_have_zero_flux() {
        let s = vec![0.3, 0.5, 0.1, 0.9];
        assert_eq!(spectral_flux(&s, &s, BinRange::new(0, 4)), 0.0);
    }

    #[test]
    fn test_decreasing_spectrum_is_rectified() {
        let prev = vec![1.0, 1.0, 1.0, 1.0];
        let cur = vec![0.5, 0.2, 0.0, 0.9];
        assert_eq!(spectral_flux(&cur, &prev, BinRange::new(0, 4)), 0.0);
    }

    #[test]
    fn test_only_increases_count() {
        let prev = vec![0.0, 1.0, 0.5, 0.0];
        let cur = vec![0.5, 0.0, 1.0, 2.0];
        // bins 0 and 2 rise by 0.5 each, bin 1 falls, bin 3 outside range
        let flux = spectral_flux(&cur, &prev, BinRange::new(0, 3));
        assert!((flux - 1.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn test_length_mismatch_panics() {
        spectral_flux(&[0.0; 4], &[0.0; 3], BinRange::new(0, 2));
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        spectral_flux(&[0.0; 4], &[0.0; 4], BinRange::new(2, 5));
    }

    #[test]
    fn test_band_average() {
        let s = vec![1.0, 2.0, 3.0, 4.0];
        assert!((band_average(&s, BinRange::new(1, 3)) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_bin_range_len() {
        assert_eq!(BinRange::new(2, 7).len(), 5);
        assert!(BinRange::new(3, 3).is_empty());
    }
}
