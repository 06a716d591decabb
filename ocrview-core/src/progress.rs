/// Indeterminate progress that eases from `start` toward `end` one frame at a
/// time, for operations whose real progress is unknown.
///
/// Each frame closes `rate` of the remaining distance. Once the remainder is
/// within `SNAP_EPSILON` the value lands exactly on `end`, so the animation
/// always terminates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EaseOutProgress {
    start: f32,
    end: f32,
    current: f32,
    rate: f32,
}

impl EaseOutProgress {
    pub const DEFAULT_RATE: f32 = 0.002;
    pub const SNAP_EPSILON: f32 = 0.001;

    pub fn new(start: f32, end: f32) -> Self {
        Self::with_rate(start, end, Self::DEFAULT_RATE)
    }

    pub fn with_rate(start: f32, end: f32, rate: f32) -> Self {
        let start = unit(start);
        let end = unit(end).max(start);
        Self {
            start,
            end,
            current: start,
            rate: if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.end
    }

    /// Advances one frame and returns the new value.
    pub fn step(&mut self) -> f32 {
        let distance = self.end - self.current;
        if distance <= Self::SNAP_EPSILON {
            self.current = self.end;
        } else {
            self.current += distance * self.rate;
        }
        self.current
    }

    pub fn finish(&mut self) {
        self.current = self.end;
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
