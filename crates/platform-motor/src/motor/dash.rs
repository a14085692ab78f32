//! Dashes: a fixed-duration displacement shaped by an easing curve.
//!
//! Each dash tick moves the body by the change in `easing(t) * distance`
//! since the previous tick, so an unobstructed dash covers exactly its
//! distance. The reported velocity is the curve's slope, clamped.

use glam::Vec2;

use super::Motor;
use crate::api::types::{CollisionFlags, LocomotionState, MotorEvent};
use crate::core::time::{frame_count, FrameTimer};

#[derive(Debug, Clone, Default)]
pub(crate) struct DashState {
    pub pressed: bool,
    pub forced: bool,
    pub end_requested: bool,
    pub requested_direction: Option<Vec2>,
    /// Fixed for the whole dash once committed.
    pub direction: Vec2,
    /// Frames left, counted down by each dash step.
    pub remaining: FrameTimer,
    pub total_frames: i32,
    pub distance: f32,
    pub duration: f32,
    /// Displacement the curve asked for so far, ignoring obstruction.
    pub distance_calculated: f32,
    /// Displacement actually covered.
    pub distance_moved: f32,
    pub cooldown: FrameTimer,
    /// Frames gravity stays off after the dash.
    pub gravity_delay: FrameTimer,
}

impl DashState {
    /// The dash countdown is driven by `Motor::dash_step`, not here.
    pub fn tick_timers(&mut self) {
        self.cooldown.tick();
        self.gravity_delay.tick();
    }

    pub fn rescale(&mut self, multiplier: f32) {
        self.cooldown.rescale(multiplier);
        self.gravity_delay.rescale(multiplier);
        if self.remaining.is_running() {
            self.remaining.rescale(multiplier);
            let scaled = (self.total_frames as f32 * multiplier).round() as i32;
            self.total_frames = scaled.max(self.remaining.frames()).max(1);
        }
    }

    fn progress(&self) -> f32 {
        if self.total_frames <= 0 {
            return 0.0;
        }
        let done = self.total_frames - self.remaining.frames().max(0);
        (done as f32 / self.total_frames as f32).clamp(0.0, 1.0)
    }
}

impl Motor {
    /// Dash in the facing direction.
    pub fn dash(&mut self) {
        self.request_dash(None, false);
    }

    /// Dash along `direction`. A zero or non-finite direction falls back to facing.
    pub fn dash_in(&mut self, direction: Vec2) {
        self.request_dash(Some(direction), false);
    }

    /// Dash even if the cooldown is still running.
    pub fn force_dash(&mut self) {
        self.request_dash(None, true);
    }

    pub fn force_dash_in(&mut self, direction: Vec2) {
        self.request_dash(Some(direction), true);
    }

    fn request_dash(&mut self, direction: Option<Vec2>, forced: bool) {
        if self.state == LocomotionState::Dashing {
            log::debug!("dash request ignored while dashing");
            return;
        }
        self.dash.pressed = true;
        self.dash.forced |= forced;
        self.dash.requested_direction = direction;
    }

    /// Cancel a pending request, or end the running dash on the next tick.
    pub fn end_dash(&mut self) {
        self.dash.pressed = false;
        self.dash.forced = false;
        if self.state == LocomotionState::Dashing {
            self.dash.end_requested = true;
        }
    }

    pub fn reset_dash_cooldown(&mut self) {
        self.dash.cooldown.expire();
    }

    /// Direction of the running or last dash.
    pub fn dash_direction(&self) -> Vec2 {
        self.dash.direction
    }

    /// Normalized time through the running dash, 0 when not dashing.
    pub fn dash_progress(&self) -> f32 {
        if self.state == LocomotionState::Dashing {
            self.dash.progress()
        } else {
            0.0
        }
    }

    /// Distance actually covered by the running or last dash.
    pub fn dash_distance_moved(&self) -> f32 {
        self.dash.distance_moved
    }

    pub fn dash_cooldown_frames(&self) -> i32 {
        self.dash.cooldown.frames()
    }

    /// Commit a pending request. The request is consumed either way.
    pub(super) fn try_commit_dash(&mut self) -> bool {
        if !self.dash.pressed {
            return false;
        }
        let forced = self.dash.forced;
        let requested = self.dash.requested_direction.take();
        self.dash.pressed = false;
        self.dash.forced = false;

        if !self.config.dash.enabled {
            log::debug!("dash request dropped: dashes disabled");
            return false;
        }
        if self.dash.cooldown.is_running() && !forced {
            log::debug!(
                "dash request dropped: cooldown {} frames",
                self.dash.cooldown.frames()
            );
            return false;
        }

        let facing = if self.facing_left { Vec2::NEG_X } else { Vec2::X };
        let direction = requested
            .filter(|d| d.is_finite())
            .and_then(|d| d.try_normalize())
            .unwrap_or(facing);

        let cfg = &self.config.dash;
        let total = frame_count(cfg.duration, self.fixed_dt).max(1);
        self.dash.direction = direction;
        self.dash.total_frames = total;
        self.dash.remaining = FrameTimer::from_frames(total);
        self.dash.distance = cfg.distance;
        self.dash.duration = cfg.duration;
        self.dash.distance_calculated = 0.0;
        self.dash.distance_moved = 0.0;
        self.dash.end_requested = false;

        // A jump pressed alongside the dash is dropped.
        self.jump.pressed = false;
        self.jump.forced = false;
        self.jump.time_told.expire();

        self.emit(MotorEvent::Dash { direction });
        true
    }

    /// One dash tick. Returns the displacement to sweep.
    pub(super) fn dash_step(&mut self) -> Vec2 {
        self.dash.remaining.tick();
        let t = self.dash.progress();
        let target = self.config.dash.easing.apply(t) * self.dash.distance;
        let delta = target - self.dash.distance_calculated;
        self.dash.distance_calculated = target;
        self.velocity = self.dash.direction * self.dash_speed(t);
        self.dash.direction * delta
    }

    /// Curve slope at `t` in units per second. Infinite slopes clamp to the
    /// float range, then to the whole distance in one tick.
    fn dash_speed(&self, t: f32) -> f32 {
        let d = &self.dash;
        if d.duration <= 0.0 {
            return 0.0;
        }
        let raw = self.config.dash.easing.derivative(t) * d.distance / d.duration;
        let raw = if raw.is_nan() {
            0.0
        } else {
            raw.clamp(f32::MIN, f32::MAX)
        };
        let limit = d.distance / self.fixed_dt;
        raw.clamp(-limit, limit)
    }

    /// Leave the dash: start the cooldown and the gravity delay, carry the
    /// final dash speed, and land or fall. The carried speed never exceeds
    /// the ground or air run speed.
    pub(super) fn finish_dash(&mut self) {
        let m = &self.config.movement;
        let cap = if self.surroundings.flags.contains(CollisionFlags::BOTTOM) {
            m.ground_speed
        } else {
            m.air_speed
        };
        let speed = self.dash_speed(1.0).clamp(-cap, cap);
        let dt = self.fixed_dt;
        self.velocity = self.dash.direction * speed;
        self.dash.cooldown = FrameTimer::start(self.config.dash.cooldown, dt);
        self.dash.gravity_delay = FrameTimer::start(self.config.dash.gravity_delay, dt);
        self.dash.remaining.expire();
        self.dash.end_requested = false;
        log::debug!(
            "dash finished: {:.3} of {:.3} covered",
            self.dash.distance_moved,
            self.dash.distance
        );
        self.emit(MotorEvent::DashEnd);
        let next = if self.is_touching_ground() {
            LocomotionState::OnGround
        } else {
            LocomotionState::Falling
        };
        self.transition(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::MotorConfig;
    use crate::api::types::{LayerMask, MotorInput};
    use crate::core::level::Level;
    use crate::core::probe::EmptyProbe;
    use crate::extensions::easing::Easing;

    const DT: f32 = 0.02;

    fn airborne(easing: Easing) -> Motor {
        let mut config = MotorConfig::default();
        config.dash.easing = easing;
        Motor::new(config, Vec2::ZERO, Vec2::splat(0.5))
    }

    #[test]
    fn dash_covers_exact_distance() {
        for easing in [Easing::Linear, Easing::QuadOut, Easing::BackOut, Easing::ExpoIn] {
            let mut motor = airborne(easing);
            motor.dash_in(Vec2::X);
            let start = motor.position();
            for tick in 1..=10 {
                motor.tick(&EmptyProbe, DT, MotorInput::default());
                if tick < 10 {
                    assert!(motor.is_dashing(), "{:?} tick {}", easing, tick);
                }
            }
            let moved = motor.position() - start;
            assert!((moved.x - 3.0).abs() < 1e-3, "{:?} moved {}", easing, moved.x);
            assert!(moved.y.abs() < 1e-6);
            assert_eq!(motor.state(), LocomotionState::Falling);
            assert!(motor.events().contains(&MotorEvent::DashEnd));
        }
    }

    #[test]
    fn dash_blocks_gravity_and_jump() {
        let mut motor = airborne(Easing::Linear);
        motor.dash();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert_eq!(motor.events(), &[MotorEvent::Dash { direction: Vec2::X }]);
        motor.jump();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(motor.is_dashing());
        assert!(motor.events().is_empty());
        assert_eq!(motor.velocity().y, 0.0);
    }

    #[test]
    fn cooldown_rejects_unforced_dash() {
        let mut motor = airborne(Easing::Linear);
        motor.dash();
        for _ in 0..10 {
            motor.tick(&EmptyProbe, DT, MotorInput::default());
        }
        assert!(!motor.is_dashing());
        motor.dash();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(!motor.is_dashing());
        assert!(!motor.dash.pressed);

        motor.force_dash();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(motor.is_dashing());

        motor.end_dash();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(!motor.is_dashing());
        motor.reset_dash_cooldown();
        motor.dash();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(motor.is_dashing());
    }

    #[test]
    fn dash_uses_facing_and_explicit_direction() {
        let mut motor = airborne(Easing::Linear);
        motor.tick(&EmptyProbe, DT, MotorInput::horizontal(-1.0));
        assert!(motor.facing_left());
        motor.dash_in(Vec2::ZERO);
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert_eq!(motor.dash_direction(), Vec2::NEG_X);

        let mut motor = airborne(Easing::Linear);
        motor.dash_in(Vec2::new(3.0, 4.0));
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!((motor.dash_direction() - Vec2::new(0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn dash_speed_is_clamped() {
        let mut motor = airborne(Easing::ExpoIn);
        motor.dash_in(Vec2::X);
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        let limit = motor.config().dash.distance / DT;
        for _ in 0..12 {
            assert!(motor.velocity().x.is_finite());
            assert!(motor.velocity().x <= limit + 1e-3);
            motor.tick(&EmptyProbe, DT, MotorInput::default());
        }
    }

    #[test]
    fn obstructed_dash_stops_at_wall() {
        let mut level = Level::new();
        level.add_box(Vec2::new(2.0, 0.0), Vec2::new(0.5, 5.0), LayerMask::STATIC);
        let mut motor = airborne(Easing::Linear);
        motor.dash_in(Vec2::X);
        for _ in 0..10 {
            motor.tick(&level, DT, MotorInput::default());
        }
        assert!(motor.position().x < 1.0);
        assert!(motor.dash_distance_moved() < 1.0);
        assert!(!motor.is_dashing());
    }

    #[test]
    fn carried_speed_is_capped_to_air_speed() {
        for easing in [Easing::Linear, Easing::ExpoIn, Easing::QuadOut] {
            let mut motor = airborne(easing);
            motor.dash_in(Vec2::X);
            for _ in 0..10 {
                motor.tick(&EmptyProbe, DT, MotorInput::default());
            }
            assert!(!motor.is_dashing());
            let air_speed = motor.config().movement.air_speed;
            assert!(motor.velocity().x <= air_speed + 1e-4, "{:?} vx {}", easing, motor.velocity().x);
            assert!(motor.velocity().x >= 0.0);
        }
    }

    #[test]
    fn gravity_waits_after_dash() {
        let mut motor = airborne(Easing::Linear);
        motor.dash_in(Vec2::X);
        for _ in 0..10 {
            motor.tick(&EmptyProbe, DT, MotorInput::default());
        }
        assert!(!motor.is_dashing());
        let delay = frame_count(motor.config().dash.gravity_delay, DT);
        for tick in 0..delay {
            motor.tick(&EmptyProbe, DT, MotorInput::default());
            assert_eq!(motor.velocity().y, 0.0, "tick {}", tick);
        }
        for _ in 0..2 {
            motor.tick(&EmptyProbe, DT, MotorInput::default());
        }
        assert!(motor.velocity().y < 0.0);
    }
}
