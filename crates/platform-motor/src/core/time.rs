/// Fixed timestep accumulator.
/// Ensures motor logic runs at a consistent rate regardless of frame time.
pub struct FixedTimestep {
    /// The fixed delta time per tick.
    dt: f32,
    /// Accumulated time from variable frame deltas.
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
        }
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt;
        // Cap to prevent spiral of death (max 10 steps per frame)
        self.accumulator = self.accumulator.min(self.dt * 10.0);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Interpolation alpha for rendering between ticks (0.0 to 1.0).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    /// The fixed delta time.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Change the tick length. Returns the `old / new` multiplier that stored
    /// frame countdowns must be rescaled by to keep their duration in seconds.
    pub fn set_dt(&mut self, dt: f32) -> f32 {
        if dt <= 0.0 || !dt.is_finite() {
            log::warn!("ignoring invalid fixed dt {}", dt);
            return 1.0;
        }
        let multiplier = self.dt / dt;
        self.dt = dt;
        self.accumulator = self.accumulator.min(dt * 10.0);
        multiplier
    }
}

// ── Timing service ───────────────────────────────────────────────────────

/// Number of whole ticks covering `seconds` at the given tick length.
#[inline]
pub fn frame_count(seconds: f32, fixed_dt: f32) -> i32 {
    if fixed_dt <= 0.0 || !fixed_dt.is_finite() || !seconds.is_finite() {
        return 0;
    }
    (seconds / fixed_dt).round() as i32
}

/// A countdown measured in ticks.
///
/// A timer is "running" while its count is zero or above; it expires once a
/// tick takes it negative. Ticking saturates instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimer(i32);

impl FrameTimer {
    pub const EXPIRED: Self = Self(-1);

    pub fn from_frames(frames: i32) -> Self {
        Self(frames)
    }

    /// Start a countdown of `seconds` at the given tick length.
    pub fn start(seconds: f32, fixed_dt: f32) -> Self {
        Self(frame_count(seconds, fixed_dt))
    }

    pub fn frames(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn tick(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    /// Zero or more frames left.
    #[inline]
    pub fn is_running(self) -> bool {
        self.0 >= 0
    }

    /// Strictly more than zero frames left.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn expire(&mut self) {
        *self = Self::EXPIRED;
    }

    /// Rescale the remaining count by `multiplier`, rounding to the nearest
    /// frame. Expired timers stay expired.
    pub fn rescale(&mut self, multiplier: f32) {
        if self.0 < 0 || !multiplier.is_finite() || multiplier <= 0.0 {
            return;
        }
        let scaled = (self.0 as f32 * multiplier).round();
        self.0 = scaled.min(i32::MAX as f32) as i32;
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::EXPIRED
    }
}
