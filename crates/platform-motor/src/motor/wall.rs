//! Pressing into walls: stick, slide, corner grab and the re-engage cooldown.

use glam::Vec2;

use super::Motor;
use crate::api::types::{CollisionFlags, LocomotionState};
use crate::core::time::FrameTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    pub fn flag(self) -> CollisionFlags {
        match self {
            WallSide::Left => CollisionFlags::LEFT,
            WallSide::Right => CollisionFlags::RIGHT,
        }
    }

    /// Unit normal pointing away from the wall.
    pub fn away_normal(self) -> Vec2 {
        match self {
            WallSide::Left => Vec2::X,
            WallSide::Right => Vec2::NEG_X,
        }
    }

    /// Sign of horizontal input that pushes into this wall.
    fn input_sign(self) -> f32 {
        match self {
            WallSide::Left => -1.0,
            WallSide::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct WallState {
    /// Frames before a wall can be engaged again.
    pub cooldown: FrameTimer,
    pub sticky: FrameTimer,
    pub corner_grab: FrameTimer,
    pub pressed_side: Option<WallSide>,
}

impl WallState {
    pub fn tick_timers(&mut self) {
        self.cooldown.tick();
        self.sticky.tick();
        self.corner_grab.tick();
    }

    pub fn rescale(&mut self, multiplier: f32) {
        self.cooldown.rescale(multiplier);
        self.sticky.rescale(multiplier);
        self.corner_grab.rescale(multiplier);
    }
}

impl Motor {
    /// Airborne, off cooldown, and pushing toward a wall on `side`.
    pub(super) fn pressing_wall(&self, side: WallSide) -> bool {
        self.state != LocomotionState::Jumping
            && !self.wall.cooldown.is_running()
            && !self.is_touching_ground()
            && self.input.move_x * side.input_sign() >= self.config.wall.valid_input_threshold
            && self.surroundings.flags.contains(side.flag())
    }

    /// The wall being pressed this tick. Left wins in a gap touching both.
    pub(super) fn wall_contact(&self) -> Option<WallSide> {
        [WallSide::Left, WallSide::Right]
            .into_iter()
            .find(|&side| self.pressing_wall(side))
    }

    /// Pick the airborne state: corner grab, then stick, then slide.
    pub(super) fn airborne_state(&mut self, prev: LocomotionState) -> LocomotionState {
        let Some(side) = self.wall_contact() else {
            return LocomotionState::Falling;
        };
        let cfg = &self.config.wall;
        let dt = self.fixed_dt;
        let descending = self.velocity.y <= 0.0;
        let fresh = !prev.is_wall_state();
        let at_corner = match side {
            WallSide::Left => self.surroundings.corner_left,
            WallSide::Right => self.surroundings.corner_right,
        };

        if cfg.enable_corner_grabs && at_corner {
            if prev == LocomotionState::OnCorner && self.wall.corner_grab.is_running() {
                return LocomotionState::OnCorner;
            }
            if fresh && descending {
                self.wall.corner_grab = FrameTimer::start(cfg.corner_grab_duration, dt);
                return LocomotionState::OnCorner;
            }
        }
        if cfg.enable_wall_sticks {
            if prev == LocomotionState::WallSticking && self.wall.sticky.is_running() {
                return LocomotionState::WallSticking;
            }
            if fresh && descending {
                self.wall.sticky = FrameTimer::start(cfg.wall_sticky_duration, dt);
                return LocomotionState::WallSticking;
            }
        }
        if cfg.enable_wall_slides && descending {
            return LocomotionState::WallSliding;
        }
        LocomotionState::Falling
    }

    /// Velocity while holding a corner or a wall.
    pub(super) fn wall_velocity(&mut self) {
        match self.state {
            LocomotionState::OnCorner => self.velocity = Vec2::ZERO,
            LocomotionState::WallSticking => {
                self.velocity.y = 0.0;
                self.air_horizontal();
            }
            LocomotionState::WallSliding => {
                let cfg = &self.config.wall;
                let rate = if cfg.time_to_wall_slide_speed > 0.0 {
                    cfg.wall_slide_speed / cfg.time_to_wall_slide_speed
                } else {
                    f32::INFINITY
                };
                self.velocity.y =
                    Motor::accelerate(self.velocity.y, rate, -cfg.wall_slide_speed, self.fixed_dt);
                self.air_horizontal();
            }
            _ => {}
        }
    }

    /// The wall currently pressed, if any.
    pub fn pressed_wall(&self) -> Option<WallSide> {
        self.wall.pressed_side
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::MotorConfig;
    use crate::api::types::{LayerMask, MotorEvent, MotorInput};
    use crate::core::level::Level;

    const DT: f32 = 0.02;

    /// A tall wall whose right face is at x = -2, top at y = 10.
    fn wall_level() -> Level {
        let mut level = Level::new();
        level.add_box(Vec2::new(-2.5, 5.0), Vec2::new(0.5, 5.0), LayerMask::STATIC);
        level
    }

    fn against_wall(config: MotorConfig, y: f32) -> Motor {
        Motor::new(config, Vec2::new(-1.49, y), Vec2::splat(0.5))
    }

    const PRESS_LEFT: MotorInput = MotorInput {
        move_x: -1.0,
        move_y: 0.0,
        fall_fast: false,
        jump_held: false,
    };

    #[test]
    fn sticks_then_slides() {
        let level = wall_level();
        let mut motor = against_wall(MotorConfig::default(), 6.0);
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.state(), LocomotionState::WallSticking);
        assert_eq!(motor.pressed_wall(), Some(WallSide::Left));
        assert_eq!(motor.velocity().y, 0.0);

        let sticky = motor.config().wall.wall_sticky_duration;
        let frames = (sticky / DT).round() as usize;
        for _ in 0..frames + 2 {
            motor.tick(&level, DT, PRESS_LEFT);
        }
        assert_eq!(motor.state(), LocomotionState::WallSliding);
        for _ in 0..50 {
            motor.tick(&level, DT, PRESS_LEFT);
        }
        assert!((motor.velocity().y + motor.config().wall.wall_slide_speed).abs() < 1e-4);
    }

    #[test]
    fn releasing_input_starts_cooldown() {
        let level = wall_level();
        let mut motor = against_wall(MotorConfig::default(), 6.0);
        motor.tick(&level, DT, PRESS_LEFT);
        motor.tick(&level, DT, MotorInput::default());
        assert_eq!(motor.state(), LocomotionState::Falling);
        assert!(motor.wall.cooldown.is_running());
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.state(), LocomotionState::Falling);
    }

    #[test]
    fn grabs_ledge_corner() {
        let level = wall_level();
        // Top of the body just above the wall top.
        let mut motor = against_wall(MotorConfig::default(), 9.6);
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.state(), LocomotionState::OnCorner);
        assert_eq!(motor.velocity(), Vec2::ZERO);

        motor.jump();
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.events(), &[MotorEvent::CornerJump]);
        assert!(motor.ignore_movement.is_positive());
    }

    #[test]
    fn wall_jump_pushes_away() {
        let level = wall_level();
        let mut motor = against_wall(MotorConfig::default(), 6.0);
        motor.tick(&level, DT, PRESS_LEFT);
        motor.jump();
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.events(), &[MotorEvent::WallJump { normal: Vec2::X }]);
        assert!(motor.velocity().x > 0.0 && motor.velocity().y > 0.0);
        assert!(motor.position().x > -1.49);
    }

    #[test]
    fn disabled_wall_features_just_fall() {
        let mut config = MotorConfig::default();
        config.wall.enable_wall_sticks = false;
        config.wall.enable_wall_slides = false;
        config.wall.enable_corner_grabs = false;
        let level = wall_level();
        let mut motor = against_wall(config, 6.0);
        motor.tick(&level, DT, PRESS_LEFT);
        assert_eq!(motor.state(), LocomotionState::Falling);
        assert_eq!(motor.pressed_wall(), Some(WallSide::Left));
    }

    #[test]
    fn left_wall_wins_in_a_narrow_gap() {
        let mut level = Level::new();
        level.add_box(Vec2::new(-1.01, 5.0), Vec2::new(0.5, 5.0), LayerMask::STATIC);
        level.add_box(Vec2::new(1.01, 5.0), Vec2::new(0.5, 5.0), LayerMask::STATIC);
        let mut config = MotorConfig::default();
        config.wall.valid_input_threshold = 0.0;
        let mut motor = Motor::new(config, Vec2::new(0.0, 6.0), Vec2::splat(0.5));

        motor.tick(&level, DT, MotorInput::default());
        assert!(motor.surroundings.flags.contains(CollisionFlags::LEFT));
        assert!(motor.surroundings.flags.contains(CollisionFlags::RIGHT));
        assert_eq!(motor.state(), LocomotionState::WallSticking);
        assert_eq!(motor.pressed_wall(), Some(WallSide::Left));

        motor.jump();
        motor.tick(&level, DT, MotorInput::default());
        assert_eq!(motor.events(), &[MotorEvent::WallJump { normal: Vec2::X }]);
    }
}
