use flux_core::ParameterRef;

use crate::envelope::OnsetEnvelope;
use crate::error::{OnsetError, Result};
use crate::spectrum::{spectral_flux, BinRange};

pub const DEFAULT_ONSET_IMPACT: f32 = 2.0;
pub const DEFAULT_SMOOTH_TIME: f32 = 0.05;
pub const DEFAULT_EVALUATION_SAMPLE_COUNT: u32 = 1000;

/// Configuration of one measured frequency band.
///
/// `parameter` receives the band's output every tick. The optional bindings
/// are polled each tick and fall back to their defaults when absent:
/// multiplier 1.0, offset 0.0, decay 0.1, target onset 0.25. Auto-gain is
/// only active when `stretch` is bound.
#[derive(Debug, Clone)]
pub struct BandConfig {
    pub min_hz: f32,
    pub max_hz: f32,
    pub onset_impact: f32,
    pub smooth_time: f32,
    pub evaluation_sample_count: u32,
    pub parameter: ParameterRef,
    pub multiplier: Option<ParameterRef>,
    pub offset: Option<ParameterRef>,
    pub decay: Option<ParameterRef>,
    pub target_onset: Option<ParameterRef>,
    pub stretch: Option<ParameterRef>,
}

impl BandConfig {
    pub fn new(min_hz: f32, max_hz: f32, parameter: ParameterRef) -> Self {
        Self {
            min_hz,
            max_hz,
            onset_impact: DEFAULT_ONSET_IMPACT,
            smooth_time: DEFAULT_SMOOTH_TIME,
            evaluation_sample_count: DEFAULT_EVALUATION_SAMPLE_COUNT,
            parameter,
            multiplier: None,
            offset: None,
            decay: None,
            target_onset: None,
            stretch: None,
        }
    }

    pub fn with_onset_impact(mut self, onset_impact: f32) -> Self {
        self.onset_impact = onset_impact;
        self
    }

    pub fn with_smooth_time(mut self, smooth_time: f32) -> Self {
        self.smooth_time = smooth_time;
        self
    }

    pub fn with_evaluation_sample_count(mut self, count: u32) -> Self {
        self.evaluation_sample_count = count;
        self
    }

    pub fn with_multiplier(mut self, param: ParameterRef) -> Self {
        self.multiplier = Some(param);
        self
    }

    pub fn with_offset(mut self, param: ParameterRef) -> Self {
        self.offset = Some(param);
        self
    }

    pub fn with_decay(mut self, param: ParameterRef) -> Self {
        self.decay = Some(param);
        self
    }

    pub fn with_target_onset(mut self, param: ParameterRef) -> Self {
        self.target_onset = Some(param);
        self
    }

    pub fn with_stretch(mut self, param: ParameterRef) -> Self {
        self.stretch = Some(param);
        self
    }

    /// Check the frequency range. `band` only labels the error.
    pub fn validate(&self, band: usize) -> Result<()> {
        // negated so NaN bounds fail too
        if !(self.min_hz < self.max_hz) {
            return Err(OnsetError::InvalidBandRange {
                band,
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            });
        }
        Ok(())
    }
}

/// Frequency covered by one FFT bin for a spectrum of `bin_count` bins
/// spanning DC to Nyquist.
pub fn hz_per_bin(sample_rate: f32, bin_count: usize) -> Result<f32> {
    if bin_count < 2 {
        return Err(OnsetError::InvalidBinCount(bin_count));
    }
    if !(sample_rate > 0.0) || !sample_rate.is_finite() {
        return Err(OnsetError::InvalidSampleRate(sample_rate));
    }
    Ok(sample_rate / (2.0 * (bin_count - 1) as f32))
}

/// Map a `[min_hz, max_hz)` band to a bin range.
///
/// Bins are `floor(hz / hz_per_bin)`. The upper bin is clamped to
/// `bin_count` so bands reaching past Nyquist stay addressable.
pub fn resolve_bins(min_hz: f32, max_hz: f32, sample_rate: f32, bin_count: usize) -> Result<BinRange> {
    resolve_band_bins(0, min_hz, max_hz, sample_rate, bin_count)
}

fn resolve_band_bins(
    band: usize,
    min_hz: f32,
    max_hz: f32,
    sample_rate: f32,
    bin_count: usize,
) -> Result<BinRange> {
    if !(min_hz < max_hz) {
        return Err(OnsetError::InvalidBandRange { band, min_hz, max_hz });
    }
    let interval = hz_per_bin(sample_rate, bin_count)?;
    let min_bin = (min_hz.max(0.0) / interval).floor() as usize;
    let mut max_bin = (max_hz.max(0.0) / interval).floor() as usize;
    if max_bin > bin_count {
        log::warn!(
            "band {band}: {max_hz} Hz lies above Nyquist, clamping to bin {bin_count}"
        );
        max_bin = bin_count;
    }
    if max_bin <= min_bin {
        return Err(OnsetError::EmptyBinRange { band, min_hz, max_hz, min_bin, max_bin });
    }
    log::debug!("band {band}: {min_hz}-{max_hz} Hz -> bins [{min_bin}, {max_bin})");
    Ok(BinRange::new(min_bin, max_bin))
}

/// A configured band together with its resolved bins and envelope.
#[derive(Debug, Clone)]
pub struct Band {
    bins: BinRange,
    envelope: OnsetEnvelope,
}

impl Band {
    pub fn bins(&self) -> BinRange {
        self.bins
    }

    pub fn envelope(&self) -> &OnsetEnvelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut OnsetEnvelope {
        &mut self.envelope
    }

    pub fn config(&self) -> &BandConfig {
        self.envelope.config()
    }
}

/// Owns every configured band and maps their Hz ranges onto FFT bins.
#[derive(Debug, Clone)]
pub struct BandRegistry {
    sample_rate: f32,
    bin_count: usize,
    bands: Vec<Band>,
}

impl BandRegistry {
    /// Validate every band and resolve its bins. Fails on the first invalid band.
    pub fn new(configs: Vec<BandConfig>, sample_rate: f32, bin_count: usize) -> Result<Self> {
        let mut bands = Vec::with_capacity(configs.len());
        for (index, config) in configs.into_iter().enumerate() {
            let bins = resolve_band_bins(index, config.min_hz, config.max_hz, sample_rate, bin_count)?;
            let envelope = OnsetEnvelope::new(config, index)?;
            bands.push(Band { bins, envelope });
        }
        Ok(Self { sample_rate, bin_count, bands })
    }

    /// Re-resolve all bands for a new sample rate. On error nothing changes.
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<()> {
        if sample_rate == self.sample_rate {
            return Ok(());
        }
        let resolved = self
            .bands
            .iter()
            .enumerate()
            .map(|(index, band)| {
                let config = band.config();
                resolve_band_bins(index, config.min_hz, config.max_hz, sample_rate, self.bin_count)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("sample rate changed {} -> {} Hz", self.sample_rate, sample_rate);
        for (band, bins) in self.bands.iter_mut().zip(resolved) {
            band.bins = bins;
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Run every band's envelope against one pair of spectra.
    pub fn update(&mut self, current: &[f32], previous: &[f32], delta_time: f32) {
        for band in &mut self.bands {
            let flux = spectral_flux(current, previous, band.bins);
            band.envelope.update(flux, delta_time);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn band_mut(&mut self, index: usize) -> Option<&mut Band> {
        self.bands.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.envelope.reset();
        }
    }
}
