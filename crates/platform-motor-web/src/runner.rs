use glam::Vec2;
use platform_motor::{
    ColliderId, FixedTimestep, FlatEvent, LayerMask, Level, Motor, MotorConfig, MotorInput,
    MotorSnapshot,
};

/// Drives one motor against a `Level` from variable browser frame times.
///
/// The host feeds frame deltas to `tick`; the runner splits them into fixed
/// steps, ticks the motor, then advances moving platforms. Events from every
/// step of a frame are kept in a flat buffer until the next frame.
pub struct MotorRunner {
    motor: Motor,
    level: Level,
    timestep: FixedTimestep,
    input: MotorInput,
    /// Flat event buffer for zero-copy reads from JS.
    events: Vec<FlatEvent>,
    snapshot: MotorSnapshot,
}

impl MotorRunner {
    pub fn new(config: MotorConfig, position: Vec2, half_extents: Vec2) -> Self {
        let timestep = FixedTimestep::new(config.environment.fixed_dt);
        let motor = Motor::new(config, position, half_extents);
        let snapshot = motor.snapshot();
        Self {
            motor,
            level: Level::new(),
            timestep,
            input: MotorInput::default(),
            events: Vec::with_capacity(32),
            snapshot,
        }
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut Motor {
        &mut self.motor
    }

    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    pub fn set_input(&mut self, input: MotorInput) {
        self.input = input;
    }

    pub fn add_box(&mut self, center: Vec2, half_extents: Vec2, moving: bool) -> ColliderId {
        self.level.add_box(center, half_extents, layer_for(moving))
    }

    pub fn add_ramp(&mut self, start: Vec2, end: Vec2) -> Option<ColliderId> {
        self.level.add_ramp(start, end, LayerMask::STATIC)
    }

    pub fn set_platform_velocity(&mut self, id: ColliderId, velocity: Vec2) {
        self.level.set_velocity(id, velocity);
    }

    /// Change the fixed step. The motor rescales its own countdowns on the
    /// next tick that sees the new length.
    pub fn set_fixed_dt(&mut self, dt: f32) {
        let multiplier = self.timestep.set_dt(dt);
        log::debug!("runner: fixed dt {} (timers x{})", self.timestep.dt(), multiplier);
    }

    /// Run one browser frame. Returns the number of fixed steps taken.
    pub fn tick(&mut self, frame_dt: f32) -> u32 {
        self.events.clear();
        if !(frame_dt.is_finite() && frame_dt > 0.0) {
            return 0;
        }

        let steps = self.timestep.accumulate(frame_dt);
        let dt = self.timestep.dt();
        for _ in 0..steps {
            self.snapshot = self.motor.tick(&self.level, dt, self.input);
            self.events
                .extend(self.motor.events().iter().map(|event| event.to_flat()));
            self.level.advance(dt);
        }
        steps
    }

    pub fn snapshot(&self) -> &MotorSnapshot {
        &self.snapshot
    }

    /// Interpolation factor between the last two fixed steps.
    pub fn alpha(&self) -> f32 {
        self.timestep.alpha()
    }

    // ---- Pointer accessors for zero-copy reads ----

    pub fn events_ptr(&self) -> *const f32 {
        self.events.as_ptr() as *const f32
    }

    pub fn events_len(&self) -> u32 {
        self.events.len() as u32
    }

    pub fn event_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.events)
    }

    pub fn snapshot_floats(&self) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(&self.snapshot))
    }
}

fn layer_for(moving: bool) -> LayerMask {
    if moving {
        LayerMask::MOVING_PLATFORM
    } else {
        LayerMask::STATIC
    }
}
