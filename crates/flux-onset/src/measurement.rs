use flux_core::MultiplyParameter;

use crate::bands::{Band, BandConfig, BandRegistry};
use crate::error::{OnsetError, Result};
use crate::handoff::SpectrumChannel;

/// Per-tick driver: keeps the previous spectrum, feeds every band's envelope
/// and publishes their outputs.
///
/// Not thread-safe by itself; spectra produced on another thread should be
/// delivered through a [`SpectrumChannel`].
#[derive(Debug, Clone)]
pub struct FluxMeasurement {
    registry: BandRegistry,
    previous: Vec<f32>,
    derived: Vec<MultiplyParameter>,
    enabled: bool,
    elapsed: f64,
    ticks: u64,
}

impl FluxMeasurement {
    pub fn new(configs: Vec<BandConfig>, sample_rate: f32, bin_count: usize) -> Result<Self> {
        let registry = BandRegistry::new(configs, sample_rate, bin_count)?;
        Ok(Self::from_registry(registry))
    }

    pub fn from_registry(registry: BandRegistry) -> Self {
        let previous = vec![0.0; registry.bin_count()];
        Self {
            registry,
            previous,
            derived: Vec::new(),
            enabled: true,
            elapsed: 0.0,
            ticks: 0,
        }
    }

    /// Derived parameters refreshed at the end of every tick.
    pub fn with_derived(mut self, derived: Vec<MultiplyParameter>) -> Self {
        self.derived = derived;
        self
    }

    /// Process one analysis frame.
    ///
    /// Panics if `spectrum` does not have the configured bin count.
    pub fn update(&mut self, spectrum: &[f32], delta_time: f32) {
        if !self.enabled {
            return;
        }
        assert_eq!(
            spectrum.len(),
            self.previous.len(),
            "spectrum bin count does not match the configured pipeline"
        );

        self.elapsed += f64::from(delta_time.max(0.0));
        self.ticks += 1;

        self.registry.update(spectrum, &self.previous, delta_time);
        for derived in &self.derived {
            derived.sync();
        }
        self.previous.copy_from_slice(spectrum);
    }

    /// Poll `channel` and tick only if a new spectrum arrived.
    pub fn update_from(&mut self, channel: &mut SpectrumChannel, delta_time: f32) -> bool {
        if !channel.poll() {
            return false;
        }
        self.update(channel.spectrum(), delta_time);
        true
    }

    /// Same as [`FluxMeasurement::update`] but reports a bin count mismatch
    /// as an error instead of panicking.
    pub fn try_update(&mut self, spectrum: &[f32], delta_time: f32) -> Result<()> {
        if spectrum.len() != self.previous.len() {
            return Err(OnsetError::SpectrumLength {
                expected: self.previous.len(),
                actual: spectrum.len(),
            });
        }
        self.update(spectrum, delta_time);
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<()> {
        self.registry.set_sample_rate(sample_rate)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Seconds of analysis processed while enabled.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn bands(&self) -> &[Band] {
        self.registry.bands()
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.registry.band(index)
    }

    pub fn registry(&self) -> &BandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BandRegistry {
        &mut self.registry
    }

    pub fn bin_count(&self) -> usize {
        self.previous.len()
    }

    /// Clear envelope state and the previous spectrum.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.previous.fill(0.0);
        self.elapsed = 0.0;
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_core::{FloatParameter, Multiply};

    const DT: f32 = 1.0 / 60.0;

    fn measurement() -> (FluxMeasurement, flux_core::ParameterRef) {
        let out = FloatParameter::shared("low", 0.0, 0.0, 100.0).unwrap();
        let m = FluxMeasurement::new(vec![BandConfig::new(20.0, 5000.0, out.clone())], 44100.0, 16).unwrap();
        (m, out)
    }

    #[test]
    fn test_previous_spectrum_is_copied() {
        let (mut m, _) = measurement();
        let spectrum = vec![1.0; 16];
        m.update(&spectrum, DT);
        assert_eq!(m.previous, spectrum);
        assert_eq!(m.ticks(), 1);
    }

    #[test]
    fn test_repeated_spectrum_has_no_flux() {
        let (mut m, out) = measurement();
        let spectrum = vec![0.4; 16];
        m.update(&spectrum, DT);
        let first = m.band(0).unwrap().envelope().state().onset_value;
        assert!(first > 0.0);
        for _ in 0..600 {
            m.update(&spectrum, DT);
        }
        assert!(out.value() < 1e-3);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let (mut m, out) = measurement();
        m.set_enabled(false);
        m.update(&vec![5.0; 16], DT);
        assert_eq!(out.value(), 0.0);
        assert_eq!(m.ticks(), 0);
        assert_eq!(m.elapsed(), 0.0);
    }

    #[test]
    fn test_try_update_reports_mismatch() {
        let (mut m, _) = measurement();
        let err = m.try_update(&[0.0; 8], DT).unwrap_err();
        assert!(matches!(err, OnsetError::SpectrumLength { expected: 16, actual: 8 }));
    }

    #[test]
    #[should_panic]
    fn test_update_panics_on_mismatch() {
        let (mut m, _) = measurement();
        m.update(&[0.0; 8], DT);
    }

    #[test]
    fn test_update_from_channel() {
        let (mut m, _) = measurement();
        let mut channel = SpectrumChannel::new(16, 4);
        assert!(!m.update_from(&mut channel, DT));
        channel.sender().send(vec![1.0; 16]).unwrap();
        assert!(m.update_from(&mut channel, DT));
        assert_eq!(m.ticks(), 1);
    }

    #[test]
    fn test_derived_parameters_synced() {
        let (m, out) = measurement();
        let doubled = FloatParameter::shared("doubled", 0.0, 0.0, 100.0).unwrap();
        let mut m = m.with_derived(vec![MultiplyParameter::new(out.clone(), Multiply::constant(2.0), doubled.clone())]);
        m.update(&vec![1.0; 16], DT);
        assert!(out.value() > 0.0);
        assert!((doubled.value() - out.value() * 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_elapsed_accumulates() {
        let (mut m, _) = measurement();
        for _ in 0..60 {
            m.update(&vec![0.0; 16], DT);
        }
        assert!((m.elapsed() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_reset_clears_previous() {
        let (mut m, _) = measurement();
        m.update(&vec![1.0; 16], DT);
        m.reset();
        assert!(m.previous.iter().all(|v| *v == 0.0));
        assert_eq!(m.band(0).unwrap().envelope().state().onset_value, 0.0);
    }
}
