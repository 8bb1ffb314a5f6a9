use flux_core::{OptionalParameter, ParameterRef, SmoothOperator};

use crate::spectrum::{band_average, BinRange};

pub const DEFAULT_LEVEL_SMOOTH_TIME: f32 = 0.01;

/// Publishes a smoothed level, optionally scaled by a multiply parameter.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    output: ParameterRef,
    multiply: Option<ParameterRef>,
    smoother: SmoothOperator,
}

impl LevelMeter {
    pub fn new(output: ParameterRef) -> Self {
        Self {
            output,
            multiply: None,
            smoother: SmoothOperator::new(0.0, DEFAULT_LEVEL_SMOOTH_TIME),
        }
    }

    pub fn with_multiply(mut self, multiply: ParameterRef) -> Self {
        self.multiply = Some(multiply);
        self
    }

    pub fn with_smooth_time(mut self, smooth_time: f32) -> Self {
        self.smoother.set_half_life(smooth_time);
        self
    }

    /// Feed one level reading and publish the smoothed result.
    pub fn update(&mut self, level: f32, delta_time: f32) -> f32 {
        let multiply = self.multiply.value_or(1.0);
        let level = self.smoother.update(level * multiply, delta_time);
        self.output.set_value(level);
        level
    }

    /// Use the mean magnitude of `range` as the level.
    pub fn update_from_spectrum(&mut self, spectrum: &[f32], range: BinRange, delta_time: f32) -> f32 {
        self.update(band_average(spectrum, range), delta_time)
    }

    pub fn output(&self) -> &ParameterRef {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_core::FloatParameter;

    #[test]
    fn test_level_follows_input() {
        let out = FloatParameter::shared("level", 0.0, 0.0, 1.0).unwrap();
        let mut meter = LevelMeter::new(out.clone());
        for _ in 0..100 {
            meter.update(0.6, 1.0 / 60.0);
        }
        assert!((out.value() - 0.6).abs() < 1e-3);
    }

    #[test]
    fn test_multiply_scales_level() {
        let out = FloatParameter::shared("level", 0.0, 0.0, 10.0).unwrap();
        let mult = FloatParameter::shared("mult", 3.0, 0.0, 10.0).unwrap();
        let mut meter = LevelMeter::new(out.clone()).with_multiply(mult).with_smooth_time(0.0);
        assert!((meter.update(0.5, 0.01) - 1.5).abs() < 1e-6);
        assert!((out.value() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_spectrum_band_level() {
        let out = FloatParameter::shared("level", 0.0, 0.0, 10.0).unwrap();
        let mut meter = LevelMeter::new(out).with_smooth_time(0.0);
        let spectrum = [0.0, 2.0, 4.0, 0.0];
        let level = meter.update_from_spectrum(&spectrum, BinRange::new(1, 3), 0.01);
        assert!((level - 3.0).abs() < 1e-6);
    }
}
