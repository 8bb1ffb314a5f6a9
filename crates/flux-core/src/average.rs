use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("evaluation sample count must be at least 1")]
pub struct ZeroWindowError;

/// Running mean that starts as an exact cumulative average and switches to an
/// exponential moving average once `window` samples have been seen.
///
/// The warm-up avoids the bias a zero-initialized EMA would have during the
/// first samples. Afterwards the EMA uses `alpha = 2 / (window + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    window: u32,
    samples_evaluated: u32,
    average: f32,
}

impl MovingAverage {
    pub fn new(window: u32) -> Result<Self, ZeroWindowError> {
        if window == 0 {
            return Err(ZeroWindowError);
        }
        Ok(Self {
            window,
            samples_evaluated: 0,
            average: 0.0,
        })
    }

    /// Feed one sample and return the updated average.
    pub fn update(&mut self, value: f32) -> f32 {
        if self.samples_evaluated < self.window {
            let n = self.samples_evaluated as f32;
            self.average = (n * self.average + value) / (n + 1.0);
            self.samples_evaluated += 1;
        } else {
            let alpha = 2.0 / (self.window as f32 + 1.0);
            self.average += (value - self.average) * alpha;
        }
        self.average
    }

    pub fn average(&self) -> f32 {
        self.average
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Number of samples consumed by the warm-up, saturating at `window`.
    pub fn samples_evaluated(&self) -> u32 {
        self.samples_evaluated
    }

    pub fn is_warmed_up(&self) -> bool {
        self.samples_evaluated >= self.window
    }

    pub fn reset(&mut self) {
        self.samples_evaluated = 0;
        self.average = 0.0;
    }
}
