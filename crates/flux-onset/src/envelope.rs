//! Per-band onset envelope follower.
//!
//! The envelope has two regimes selected by comparing the incoming raw onset
//! with the previous envelope level:
//!
//! - **attack**: the raw onset is above the previous level. Velocity is reset
//!   and acceleration is set from a parabola over the jump size, peaking at a
//!   jump of 1.0 and falling off for larger jumps.
//! - **decay**: the raw onset is at or below the previous level. Acceleration
//!   keeps decreasing at the decay rate and velocity integrates it, giving a
//!   ballistic fall-off instead of a snap to zero.
//!
//! The resulting level can optionally be auto-scaled ("stretched") so that its
//! long-run average approaches a target value.

use flux_core::{MovingAverage, OptionalParameter, SmoothOperator};

use crate::bands::BandConfig;
use crate::error::{OnsetError, Result};

/// Acceleration lost per millisecond in the decay regime when no decay
/// parameter is bound.
pub const DEFAULT_DECAY: f32 = 0.1;
/// Long-run average the stretch factor aims for when no target is bound.
pub const DEFAULT_TARGET_ONSET: f32 = 0.25;
/// Half-life of the stretch factor smoother, in seconds.
pub const STRETCH_HALF_LIFE: f32 = 0.5;
/// Lowest velocity the envelope may reach, in units per second.
pub const VELOCITY_FLOOR: f32 = -1000.0;
/// Smallest time step accepted by [`OnsetEnvelope::update`].
pub const MIN_DELTA_TIME: f32 = 1e-5;
/// Lower bound for the running average used as stretch divisor.
pub const AVERAGE_FLOOR: f32 = f32::EPSILON * 2.0;

/// Snapshot of one band's evolving state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandState {
    pub onset_value: f32,
    pub velocity: f32,
    pub acceleration: f32,
    pub samples_evaluated: u32,
    pub running_average: f32,
}

/// Envelope follower for a single band. Owns all of the band's mutable state.
#[derive(Debug, Clone)]
pub struct OnsetEnvelope {
    config: BandConfig,
    onset_value: f32,
    velocity: f32,
    acceleration: f32,
    average: MovingAverage,
    onset_smoother: SmoothOperator,
    stretch_smoother: SmoothOperator,
    stretch: f32,
    output: f32,
}

impl OnsetEnvelope {
    /// Build an envelope from `config`. `band` only labels errors.
    pub fn new(config: BandConfig, band: usize) -> Result<Self> {
        config.validate(band)?;
        let average = MovingAverage::new(config.evaluation_sample_count)
            .map_err(|source| OnsetError::InvalidEvaluationWindow { band, source })?;
        let onset_smoother = SmoothOperator::new(0.0, config.smooth_time);
        Ok(Self {
            config,
            onset_value: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            average,
            onset_smoother,
            stretch_smoother: SmoothOperator::new(1.0, STRETCH_HALF_LIFE),
            stretch: 1.0,
            output: 0.0,
        })
    }

    /// Advance the envelope by one tick.
    ///
    /// `raw_flux` is the spectral flux for this band, `delta_time` the tick
    /// length in seconds. Returns the value published to the output
    /// parameter.
    pub fn update(&mut self, raw_flux: f32, delta_time: f32) -> f32 {
        let dt = if delta_time >= MIN_DELTA_TIME { delta_time } else { MIN_DELTA_TIME };

        let raw_onset = raw_flux * self.config.multiplier.value_or(1.0);
        let previous_onset = self.onset_value;

        if raw_onset > previous_onset {
            let diff = (raw_onset - previous_onset).abs();
            self.acceleration = (1.0 - (diff - 1.0).powi(2)) * self.config.onset_impact;
            self.velocity = 0.0;
        } else {
            let decay = self.config.decay.value_or(DEFAULT_DECAY);
            self.acceleration -= decay * dt * 1000.0;
        }

        self.velocity = (self.velocity + self.acceleration * dt).max(VELOCITY_FLOOR);
        let onset = (raw_onset.max(previous_onset) + self.velocity * dt).max(0.0);

        self.stretch = 1.0;
        if let Some(stretch) = &self.config.stretch {
            let average = self.average.update(onset).max(AVERAGE_FLOOR);
            let target = self.config.target_onset.value_or(DEFAULT_TARGET_ONSET);
            stretch.set_value(self.stretch_smoother.update(target / average, dt));
            self.stretch = stretch.value();
        }

        self.onset_value = onset;
        let smooth_onset = self.onset_smoother.update(onset, dt);
        let offset = self.config.offset.value_or(0.0);
        self.output = smooth_onset * self.stretch + offset;
        self.config.parameter.set_value(self.output);
        self.output
    }

    pub fn state(&self) -> BandState {
        BandState {
            onset_value: self.onset_value,
            velocity: self.velocity,
            acceleration: self.acceleration,
            samples_evaluated: self.average.samples_evaluated(),
            running_average: self.average.average(),
        }
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    /// Stretch factor applied on the last tick (1.0 when unbound).
    pub fn stretch(&self) -> f32 {
        self.stretch
    }

    /// Last published value.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Return to the freshly constructed state.
    pub fn reset(&mut self) {
        self.onset_value = 0.0;
        self.velocity = 0.0;
        self.acceleration = 0.0;
        self.average.reset();
        self.onset_smoother.set_value(0.0);
        self.stretch_smoother.set_value(1.0);
        self.stretch = 1.0;
        self.output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_core::{FloatParameter, ParameterRef};

    const DT: f32 = 1.0 / 60.0;

    fn output_param() -> ParameterRef {
        FloatParameter::shared("onset", 0.0, 0.0, 1000.0).unwrap()
    }

    fn envelope() -> OnsetEnvelope {
        OnsetEnvelope::new(BandConfig::new(20.0, 200.0, output_param()), 0).unwrap()
    }

    #[test]
    fn test_attack_sets_parabolic_acceleration() {
        let mut env = envelope();
        env.update(1.0, DT);
        let state = env.state();
        // diff == 1 peaks the parabola: acceleration == onset_impact
        assert!((state.acceleration - 2.0).abs() < 1e-6);
        assert!((state.velocity - 2.0 * DT).abs() < 1e-6);
        assert!((state.onset_value - (1.0 + 2.0 * DT * DT)).abs() < 1e-5);
    }

    #[test]
    fn test_large_jump_reduces_acceleration() {
        let mut env = envelope();
        env.update(3.0, DT);
        // 1 - (3 - 1)^2 = -3
        assert!((env.state().acceleration + 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_decay_keeps_velocity() {
        let mut env = envelope();
        env.update(1.0, DT);
        let before = env.state();
        env.update(0.0, DT);
        let after = env.state();
        let expected_accel = before.acceleration - DEFAULT_DECAY * DT * 1000.0;
        assert!((after.acceleration - expected_accel).abs() < 1e-5);
        assert!((after.velocity - (before.velocity + expected_accel * DT)).abs() < 1e-5);
    }

    #[test]
    fn test_bound_decay_is_used() {
        let decay = FloatParameter::shared("decay", 0.5, 0.0, 1.0).unwrap();
        let config = BandConfig::new(20.0, 200.0, output_param()).with_decay(decay);
        let mut env = OnsetEnvelope::new(config, 0).unwrap();
        env.update(0.0, DT);
        assert!((env.state().acceleration + 0.5 * DT * 1000.0).abs() < 1e-4);
    }

    #[test]
    fn test_multiplier_scales_raw_flux() {
        let mult = FloatParameter::shared("mult", 2.0, 0.0, 10.0).unwrap();
        let config = BandConfig::new(20.0, 200.0, output_param()).with_multiplier(mult);
        let mut env = OnsetEnvelope::new(config, 0).unwrap();
        env.update(0.5, DT);
        // raw onset 1.0 peaks the parabola
        assert!((env.state().acceleration - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_delta_time_is_clamped() {
        let mut env = envelope();
        let out = env.update(1.0, 0.0);
        assert!(out.is_finite());
        let out = env.update(1.0, -1.0);
        assert!(out.is_finite() && out >= 0.0);
    }

    #[test]
    fn test_offset_added_to_output() {
        let offset = FloatParameter::shared("offset", 0.3, 0.0, 1.0).unwrap();
        let config = BandConfig::new(20.0, 200.0, output_param()).with_offset(offset);
        let mut env = OnsetEnvelope::new(config, 0).unwrap();
        let out = env.update(0.0, DT);
        assert!((out - 0.3).abs() < 1e-6);
        assert!((env.config().parameter.value() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_stretch_unbound_is_identity() {
        let mut env = envelope();
        env.update(0.7, DT);
        assert_eq!(env.stretch(), 1.0);
        assert_eq!(env.state().samples_evaluated, 0);
    }

    #[test]
    fn test_reset() {
        let mut env = envelope();
        for _ in 0..10 {
            env.update(0.8, DT);
        }
        env.reset();
        assert_eq!(env.state(), BandState::default());
        assert_eq!(env.output(), 0.0);
    }
}
