//! Jump requests: buffering, grace windows, and the ground → corner → wall →
//! air priority chain.

use glam::Vec2;

use super::wall::WallSide;
use super::Motor;
use crate::api::types::{LocomotionState, MotorEvent};
use crate::core::time::FrameTimer;

/// What the body could last jump off, kept alive by the grace countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpType {
    #[default]
    None,
    Normal,
    LeftWall,
    RightWall,
    Corner,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct JumpState {
    /// A request is pending this tick.
    pub pressed: bool,
    /// The button is still down.
    pub held: bool,
    pub forced: bool,
    /// Cut the current jump short on the next tick.
    pub end_requested: bool,
    pub height: f32,
    pub air_jumps_used: u32,
    /// Frames a press stays buffered.
    pub time_told: FrameTimer,
    /// Frames gravity is skipped while the button is held.
    pub allow_extra: FrameTimer,
    pub last_valid: JumpType,
    pub grace: FrameTimer,
}

impl JumpState {
    pub fn tick_timers(&mut self) {
        self.time_told.tick();
        self.allow_extra.tick();
        self.grace.tick();
    }

    pub fn rescale(&mut self, multiplier: f32) {
        self.time_told.rescale(multiplier);
        self.allow_extra.rescale(multiplier);
        self.grace.rescale(multiplier);
    }

    fn set_last_valid(&mut self, kind: JumpType, grace: FrameTimer) {
        self.last_valid = kind;
        self.grace = if kind == JumpType::None {
            FrameTimer::EXPIRED
        } else {
            grace
        };
    }

    fn grace_allows(&self, kind: JumpType) -> bool {
        self.last_valid == kind && self.grace.is_running()
    }
}

impl Motor {
    /// Request a jump of the configured height.
    pub fn jump(&mut self) {
        self.request_jump(self.config.jump.height, false);
    }

    /// Request a jump reaching `height`.
    pub fn jump_to_height(&mut self, height: f32) {
        self.request_jump(height, false);
    }

    /// Request a jump that succeeds whatever the body is touching.
    pub fn force_jump(&mut self) {
        self.request_jump(self.config.jump.height, true);
    }

    pub fn force_jump_to_height(&mut self, height: f32) {
        self.request_jump(height, true);
    }

    fn request_jump(&mut self, height: f32, forced: bool) {
        if self.state == LocomotionState::Dashing {
            log::debug!("jump request ignored while dashing");
            return;
        }
        if !(height.is_finite() && height > 0.0) {
            log::warn!("jump request with invalid height {} ignored", height);
            return;
        }
        let jump = &mut self.jump;
        jump.pressed = true;
        jump.held = true;
        jump.forced |= forced;
        jump.height = height;
        jump.time_told = FrameTimer::start(self.config.jump.window_when_activated, self.fixed_dt);
    }

    /// Drop a pending request and cut an ascending jump short. Air jumps
    /// already spent stay spent.
    pub fn end_jump(&mut self) {
        self.jump.pressed = false;
        self.jump.forced = false;
        self.jump.held = false;
        self.jump.time_told.expire();
        self.jump.end_requested = self.state == LocomotionState::Jumping;
    }

    /// Give back every air jump spent since the last ground contact.
    pub fn reset_air_jump(&mut self) {
        self.jump.air_jumps_used = 0;
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.config.jump.num_air_jumps.saturating_sub(self.jump.air_jumps_used)
    }

    pub fn last_jump_type(&self) -> JumpType {
        self.jump.last_valid
    }

    /// Remember what the body can jump off this tick and refill its grace window.
    pub(super) fn record_jump_reference(&mut self) {
        let kind = match self.state {
            LocomotionState::OnGround | LocomotionState::Slipping => JumpType::Normal,
            LocomotionState::OnCorner => JumpType::Corner,
            _ if !self.config.wall.enable_wall_jumps => JumpType::None,
            _ => match self.wall.pressed_side {
                Some(WallSide::Left) => JumpType::LeftWall,
                Some(WallSide::Right) => JumpType::RightWall,
                None => JumpType::None,
            },
        };
        if kind != JumpType::None {
            let grace = FrameTimer::start(self.config.jump.window_when_falling, self.fixed_dt);
            self.jump.set_last_valid(kind, grace);
        }
    }

    /// Runs before gravity: re-arm a buffered press and decide whether the
    /// held button keeps gravity off.
    pub(super) fn prepare_jump(&mut self) {
        if self.jump.time_told.is_running() {
            self.jump.pressed = true;
        }
        self.ignore_gravity = self.state == LocomotionState::Jumping
            && self.jump.held
            && self.jump.allow_extra.is_positive();
    }

    /// Honor a pending request against the first reference that allows it.
    pub(super) fn resolve_jump(&mut self) {
        if !self.jump.pressed {
            return;
        }
        self.jump.pressed = false;
        let forced = std::mem::take(&mut self.jump.forced);
        if !self.config.jump.enabled {
            return;
        }

        let speed = self.config.jump_speed(self.jump.height);
        let state = self.state;

        let outcome = if forced
            || matches!(state, LocomotionState::OnGround | LocomotionState::Slipping)
            || self.jump.grace_allows(JumpType::Normal)
        {
            if state == LocomotionState::Slipping {
                self.velocity = self.surroundings.slope_normal * speed;
            } else {
                self.velocity.y = speed;
            }
            MotorEvent::Jump
        } else if state == LocomotionState::OnCorner || self.jump.grace_allows(JumpType::Corner) {
            self.velocity = Vec2::Y * speed * self.config.jump.corner_jump_multiplier;
            self.start_wall_detach();
            MotorEvent::CornerJump
        } else if let Some(side) = self.wall_jump_side() {
            let angle = self.config.wall.wall_jump_angle.to_radians();
            let normal = side.away_normal();
            self.velocity = Vec2::new(normal.x * angle.cos(), angle.sin())
                * speed
                * self.config.wall.wall_jump_multiplier;
            self.start_wall_detach();
            self.jump.air_jumps_used = 0;
            MotorEvent::WallJump { normal }
        } else if self.jump.air_jumps_used < self.config.jump.num_air_jumps {
            self.jump.air_jumps_used += 1;
            self.velocity.y = speed;
            MotorEvent::AirJump
        } else {
            log::debug!("jump request dropped in {:?}", state);
            return;
        };

        self.jump.time_told.expire();
        self.jump.set_last_valid(JumpType::None, FrameTimer::EXPIRED);
        self.jump.allow_extra = if speed > 0.0 {
            FrameTimer::start(self.config.jump.extra_height / speed, self.fixed_dt)
        } else {
            FrameTimer::EXPIRED
        };
        self.amount_jumped_for = 0.0;
        self.surroundings.platform_velocity = None;
        self.transition(LocomotionState::Jumping);
        self.emit(outcome);
    }

    /// Left wins when both sides qualify.
    fn wall_jump_side(&self) -> Option<WallSide> {
        let enabled = self.config.wall.enable_wall_jumps;
        [WallSide::Left, WallSide::Right].into_iter().find(|&side| {
            let kind = match side {
                WallSide::Left => JumpType::LeftWall,
                WallSide::Right => JumpType::RightWall,
            };
            self.jump.grace_allows(kind) || (enabled && self.pressing_wall(side))
        })
    }

    /// Ignore input briefly and keep walls from grabbing the body right away.
    fn start_wall_detach(&mut self) {
        let dt = self.fixed_dt;
        self.ignore_movement =
            FrameTimer::start(self.config.movement.ignore_movement_after_jump, dt);
        self.wall.cooldown = FrameTimer::start(self.config.wall.interaction_cooldown, dt);
    }
}
