/// Difference below which the smoother snaps onto its target.
pub const SMOOTH_SNAP_THRESHOLD: f32 = 1e-7;

/// Single-pole exponential smoother parameterized by a half-life.
///
/// Each call to [`SmoothOperator::update`] moves the value towards the target
/// so that, for a constant target, the remaining distance halves every
/// `half_life` seconds. The response to a step is monotonic and never
/// overshoots. A non-positive half-life disables smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothOperator {
    value: f32,
    half_life: f32,
}

impl SmoothOperator {
    pub fn new(value: f32, half_life: f32) -> Self {
        Self { value, half_life }
    }

    /// Advance towards `target` by `delta_time` seconds and return the new value.
    pub fn update(&mut self, target: f32, delta_time: f32) -> f32 {
        if self.half_life <= 0.0 || delta_time <= 0.0 {
            if self.half_life <= 0.0 {
                self.value = target;
            }
            return self.value;
        }

        let weight = 1.0 - 0.5_f32.powf(delta_time / self.half_life);
        let diff = target - self.value;
        if diff.abs() < SMOOTH_SNAP_THRESHOLD {
            self.value = target;
        } else {
            self.value += diff * weight;
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Jump to `value` without smoothing.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn half_life(&self) -> f32 {
        self.half_life
    }

    pub fn set_half_life(&mut self, half_life: f32) {
        self.half_life = half_life;
    }
}
