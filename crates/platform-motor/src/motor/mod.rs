//! The character motor: one controlled box stepped at a fixed rate against a
//! `Probe`.
//!
//! Each `tick` runs, in order: timers, surroundings, locomotion state,
//! velocity (gravity, input, slope, platform, jump, plugins), the swept move,
//! ground snapping, and post-move bookkeeping. Host calls such as `jump` or `dash` only record
//! intent; the next tick decides what happens.

pub mod dash;
pub mod jump;
mod surroundings;
pub mod wall;

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::api::config::MotorConfig;
use crate::api::types::{
    ColliderId, CollisionFlags, LocomotionState, MotorEvent, MotorInput, MotorSnapshot,
};
use crate::core::probe::Probe;
use crate::core::time::FrameTimer;
use crate::extensions::plugin::{MotorPlugin, MotorView, PluginChain, PluginHandle};

use dash::DashState;
use jump::JumpState;
use surroundings::{ProbeSettings, Surroundings};
use wall::WallState;

/// Velocity along the ground normal above which the body is leaving the ground.
const GROUND_SEPARATION_EPS: f32 = 1.0e-3;

pub struct Motor {
    config: MotorConfig,
    position: Vec2,
    half_extents: Vec2,
    /// Velocity relative to any platform the body stands on.
    velocity: Vec2,
    state: LocomotionState,
    input: MotorInput,
    facing_left: bool,
    active: bool,
    fixed_dt: f32,
    surroundings: Surroundings,
    jump: JumpState,
    dash: DashState,
    wall: WallState,
    freedom: bool,
    ignore_movement: FrameTimer,
    ignore_gravity: bool,
    amount_jumped_for: f32,
    plugins: PluginChain,
    events: Vec<MotorEvent>,
}

impl Motor {
    /// Create an active motor. The box is centered at `position`.
    pub fn new(config: MotorConfig, position: Vec2, half_extents: Vec2) -> Self {
        let fixed_dt = config.environment.fixed_dt;
        Self {
            config,
            position,
            half_extents: half_extents.abs(),
            velocity: Vec2::ZERO,
            state: LocomotionState::Falling,
            input: MotorInput::default(),
            facing_left: false,
            active: true,
            fixed_dt,
            surroundings: Surroundings::default(),
            jump: JumpState::default(),
            dash: DashState::default(),
            wall: WallState::default(),
            freedom: false,
            ignore_movement: FrameTimer::EXPIRED,
            ignore_gravity: false,
            amount_jumped_for: 0.0,
            plugins: PluginChain::new(),
            events: Vec::with_capacity(8),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    pub fn activate(&mut self) {
        if !self.active {
            self.active = true;
            log::debug!("motor activated at {:?}", self.position);
        }
    }

    /// Stop ticking, drop all transient state and detach every plugin.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.velocity = Vec2::ZERO;
        self.state = LocomotionState::Falling;
        self.input = MotorInput::default();
        self.surroundings = Surroundings::default();
        self.jump = JumpState::default();
        self.dash = DashState::default();
        self.wall = WallState::default();
        self.freedom = false;
        self.ignore_movement = FrameTimer::EXPIRED;
        self.ignore_gravity = false;
        self.amount_jumped_for = 0.0;
        self.events.clear();
        self.plugins.detach_all();
        log::debug!("motor deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // ── Plugins ──────────────────────────────────────────────────────────

    pub fn attach<P: MotorPlugin + 'static>(&mut self, plugin: &Rc<RefCell<P>>) -> PluginHandle {
        self.plugins.attach(plugin)
    }

    pub fn detach(&mut self, handle: PluginHandle) -> bool {
        self.plugins.detach(handle)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    // ── Tick ─────────────────────────────────────────────────────────────

    /// Advance one fixed step of `dt` seconds. A dt different from the last
    /// one rescales every running countdown first.
    pub fn tick<P: Probe + ?Sized>(&mut self, probe: &P, dt: f32, input: MotorInput) -> MotorSnapshot {
        if !self.active {
            return self.snapshot();
        }
        if !(dt > 0.0 && dt.is_finite()) {
            log::warn!("motor: ignoring tick with invalid dt {}", dt);
            return self.snapshot();
        }
        if dt != self.fixed_dt {
            let multiplier = self.fixed_dt / dt;
            self.fixed_dt = dt;
            self.readjust_timers(multiplier);
        }

        self.events.clear();
        self.input = input;
        if !input.jump_held {
            self.jump.held = false;
        }

        self.update_timers();
        self.surroundings = self.probe_surroundings(probe);
        self.update_state();
        let displacement = self.compute_velocity();
        let before = self.position;
        self.apply_move(probe, displacement);
        self.snap_to_ground(probe);
        self.surroundings = self.probe_surroundings(probe);
        self.post_move(before);

        self.snapshot()
    }

    /// Count every running countdown down by one frame.
    fn update_timers(&mut self) {
        self.jump.tick_timers();
        self.dash.tick_timers();
        self.wall.tick_timers();
        self.ignore_movement.tick();
    }

    /// Rescale every stored countdown by `multiplier` (old tick length over
    /// new). A multiplier of 1 leaves everything unchanged.
    pub fn readjust_timers(&mut self, multiplier: f32) {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            log::warn!("motor: ignoring timer rescale by {}", multiplier);
            return;
        }
        self.jump.rescale(multiplier);
        self.dash.rescale(multiplier);
        self.wall.rescale(multiplier);
        self.ignore_movement.rescale(multiplier);
        log::debug!("motor timers rescaled by {}", multiplier);
    }

    fn probe_settings(&self) -> ProbeSettings {
        let env = &self.config.environment;
        let ground_reach = self
            .surroundings
            .platform_velocity
            .map_or(0.0, |v| v.length() * self.fixed_dt);
        ProbeSettings {
            mask: env.collision_mask,
            check_distance: env.check_distance,
            ground_reach,
            skin: env.min_distance_from_env,
            wall_max_normal_y: self.config.slopes.max_walkable_angle.to_radians().cos(),
            corner_distance_check: self.config.wall.corner_distance_check,
            max_iterations: env.max_move_iterations,
        }
    }

    fn probe_surroundings<P: Probe + ?Sized>(&self, probe: &P) -> Surroundings {
        let settings = self.probe_settings();
        let mut found = surroundings::resolve(probe, self.position, self.half_extents, &settings);
        if !self.config.slopes.enabled {
            found.slope_normal = Vec2::Y;
        }
        found
    }

    fn update_state(&mut self) {
        let prev = self.state;

        let next = if prev == LocomotionState::Dashing && !self.dash.end_requested {
            LocomotionState::Dashing
        } else {
            if prev == LocomotionState::Dashing {
                self.finish_dash();
            }
            if self.try_commit_dash() {
                LocomotionState::Dashing
            } else if self.freedom {
                LocomotionState::FreedomOverride
            } else if self.state == LocomotionState::Jumping
                && !self.jump.end_requested
                && self.velocity.y > 0.0
            {
                LocomotionState::Jumping
            } else if self.is_touching_ground() {
                if self.slope_too_steep() {
                    LocomotionState::Slipping
                } else {
                    LocomotionState::OnGround
                }
            } else {
                self.airborne_state(self.state)
            }
        };
        self.jump.end_requested = false;
        self.transition(next);

        if !Self::is_air_state(self.state) {
            self.jump.air_jumps_used = 0;
        }
        self.wall.pressed_side = self.wall_contact();
        self.record_jump_reference();
    }

    /// Switch state, firing the side effects tied to entering or leaving one.
    fn transition(&mut self, next: LocomotionState) {
        let prev = self.state;
        if prev == next {
            return;
        }
        log::debug!("motor state {:?} -> {:?}", prev, next);
        if prev.is_wall_state() && !next.is_wall_state() {
            self.wall.cooldown =
                FrameTimer::start(self.config.wall.interaction_cooldown, self.fixed_dt);
        }
        let landed = matches!(next, LocomotionState::OnGround | LocomotionState::Slipping)
            && (prev == LocomotionState::Jumping
                || prev == LocomotionState::Falling
                || prev.is_wall_state());
        self.state = next;
        if landed {
            self.emit(MotorEvent::Landed);
        }
    }

    fn is_air_state(state: LocomotionState) -> bool {
        !matches!(
            state,
            LocomotionState::OnGround | LocomotionState::Slipping | LocomotionState::FreedomOverride
        )
    }

    /// Touching ground and not moving away from it.
    fn is_touching_ground(&self) -> bool {
        self.surroundings.flags.contains(CollisionFlags::BOTTOM)
            && self.velocity.dot(self.surroundings.slope_normal) <= GROUND_SEPARATION_EPS
    }

    fn slope_too_steep(&self) -> bool {
        self.config.slopes.enabled
            && self.surroundings.slope_normal.y
                < self.config.slopes.max_walkable_angle.to_radians().cos()
    }

    /// Returns the displacement to sweep this tick.
    fn compute_velocity(&mut self) -> Vec2 {
        if self.state == LocomotionState::Dashing {
            return self.dash_step();
        }

        let dt = self.fixed_dt;
        if !self.ignore_movement.is_positive() && self.input.move_x != 0.0 {
            self.facing_left = self.input.move_x < 0.0;
        }
        self.prepare_jump();

        match self.state {
            LocomotionState::FreedomOverride => {
                let dir = Vec2::new(self.input.move_x, self.input.move_y).clamp_length_max(1.0);
                self.velocity = dir * self.config.movement.ground_speed;
            }
            LocomotionState::OnGround => self.walk(),
            LocomotionState::Slipping => self.slip(),
            LocomotionState::OnCorner | LocomotionState::WallSticking | LocomotionState::WallSliding => {
                self.wall_velocity();
            }
            LocomotionState::Jumping | LocomotionState::Falling | LocomotionState::Dashing => {
                self.apply_gravity();
                self.air_horizontal();
            }
        }

        self.resolve_jump();

        if !self.plugins.is_empty() {
            let view = self.view();
            self.velocity = self.plugins.contribute(&view, self.velocity);
        }

        (self.velocity + self.surroundings.platform_velocity()) * dt
    }

    fn gravity_suppressed(&self) -> bool {
        if self.ignore_gravity || self.dash.gravity_delay.is_running() {
            return true;
        }
        !self.plugins.is_empty() && self.plugins.overrides_gravity(&self.view())
    }

    /// Gravity with a terminal cap. Above the cap the speed decays back toward
    /// it exponentially instead of snapping.
    fn apply_gravity(&mut self) {
        if self.gravity_suppressed() {
            return;
        }
        let m = &self.config.movement;
        let dt = self.fixed_dt;
        let (multiplier, cap) = if self.input.fall_fast {
            (m.fast_fall_gravity_multiplier, m.fast_fall_speed)
        } else {
            (1.0, m.fall_speed)
        };
        let g = self.gravity() * multiplier;
        let vy = self.velocity.y;
        self.velocity.y = if vy < -cap {
            -cap + (vy + cap) * (-m.terminal_approach_rate * dt).exp()
        } else {
            (vy + g * dt).max(-cap)
        };
    }

    /// Signed gravity after the multiplier.
    pub fn gravity(&self) -> f32 {
        self.config.environment.gravity * self.config.movement.gravity_multiplier
    }

    fn walk(&mut self) {
        let n = self.surroundings.slope_normal;
        let tangent = Vec2::new(n.y, -n.x);
        let m = &self.config.movement;
        let current = self.velocity.dot(tangent);
        let input = if self.ignore_movement.is_positive() { 0.0 } else { self.input.move_x };
        let speed = horizontal_speed(
            current,
            input,
            m.ground_speed,
            m.time_to_ground_speed,
            m.ground_stop_distance,
            self.fixed_dt,
        );
        self.velocity = tangent * speed;
    }

    /// Slide down a slope too steep to stand on.
    fn slip(&mut self) {
        let n = self.surroundings.slope_normal;
        let mut downhill = Vec2::new(n.y, -n.x);
        if downhill.y > 0.0 {
            downhill = -downhill;
        }
        let accel = self.gravity().abs() * (1.0 - n.y * n.y).max(0.0).sqrt();
        let current = self.velocity.dot(downhill).max(0.0);
        let speed = (current + accel * self.fixed_dt).min(self.config.movement.fall_speed);
        self.velocity = downhill * speed;
    }

    fn air_horizontal(&mut self) {
        if self.ignore_movement.is_positive() {
            return;
        }
        let m = &self.config.movement;
        let input = self.input.move_x;
        if !m.change_direction_in_air && input * self.velocity.x < 0.0 {
            return;
        }
        self.velocity.x = horizontal_speed(
            self.velocity.x,
            input,
            m.air_speed,
            m.time_to_air_speed,
            m.air_stop_distance,
            self.fixed_dt,
        );
    }

    /// Move `current` toward `limit` at `acceleration` units per second,
    /// never overshooting.
    pub fn accelerate(current: f32, acceleration: f32, limit: f32, dt: f32) -> f32 {
        let step = acceleration.abs() * dt;
        if current < limit {
            (current + step).min(limit)
        } else {
            (current - step).max(limit)
        }
    }

    fn apply_move<P: Probe + ?Sized>(&mut self, probe: &P, displacement: Vec2) {
        let settings = self.probe_settings();
        let result = surroundings::sweep(
            probe,
            self.position,
            self.half_extents,
            displacement,
            self.velocity,
            &settings,
        );
        if !result.blocked.is_empty() {
            log::trace!("move blocked on {:#06b}", result.blocked.0);
        }
        self.position = result.position;
        self.velocity = result.velocity;
    }

    /// Keep a walking body on the ground where the surface drops away or
    /// levels out beneath it, instead of letting it fly off for a few ticks.
    /// The reach covers the steepest walkable drop over this tick's travel.
    fn snap_to_ground<P: Probe + ?Sized>(&mut self, probe: &P) {
        if self.state != LocomotionState::OnGround
            || self.velocity.dot(self.surroundings.slope_normal) > GROUND_SEPARATION_EPS
        {
            return;
        }
        let settings = self.probe_settings();
        let max_angle = self.config.slopes.max_walkable_angle.clamp(0.0, 85.0).to_radians();
        let travel = self.velocity.length() * self.fixed_dt;
        let reach = settings.check_distance + travel * max_angle.tan();
        let Some(hit) =
            surroundings::ground_below(probe, self.position, self.half_extents, reach, &settings)
        else {
            return;
        };

        let drop = (hit.distance - settings.skin).max(0.0);
        self.position.y -= drop;

        let n = if self.config.slopes.enabled { hit.normal } else { Vec2::Y };
        let tangent = Vec2::new(n.y, -n.x);
        let along = self.velocity.dot(tangent);
        self.velocity = if along.abs() > GROUND_SEPARATION_EPS {
            tangent * self.velocity.length().copysign(along)
        } else {
            Vec2::ZERO
        };
        if drop > 0.0 {
            log::trace!("snapped {:.4} down to ground {:?}", drop, hit.collider);
        }
    }

    fn post_move(&mut self, before: Vec2) {
        let moved = self.position - before;
        match self.state {
            LocomotionState::Jumping => {
                self.amount_jumped_for += moved.y.abs();
                if self.velocity.y <= 0.0 {
                    self.transition(LocomotionState::Falling);
                }
            }
            LocomotionState::Dashing => {
                self.dash.distance_moved += moved.length();
                if self.dash.remaining.frames() <= 0 {
                    self.finish_dash();
                }
            }
            _ => {}
        }
    }

    fn emit(&mut self, event: MotorEvent) {
        log::debug!("motor event {:?}", event);
        self.events.push(event);
        self.plugins.notify(&event);
    }

    // ── Host-facing state ────────────────────────────────────────────────

    /// Request or release the free-movement override (ladders, cutscenes).
    pub fn set_freedom(&mut self, enabled: bool) {
        self.freedom = enabled;
    }

    /// Place the body without sweeping. Velocity is kept.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
        self.surroundings = Surroundings::default();
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MotorConfig {
        &mut self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    /// Velocity relative to the platform underfoot.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        if velocity.is_finite() {
            self.velocity = velocity;
        }
    }

    /// Velocity including the platform underfoot.
    pub fn world_velocity(&self) -> Vec2 {
        self.velocity + self.surroundings.platform_velocity()
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn is_grounded(&self) -> bool {
        matches!(self.state, LocomotionState::OnGround | LocomotionState::Slipping)
    }

    pub fn is_falling(&self) -> bool {
        self.state == LocomotionState::Falling
    }

    pub fn is_jumping(&self) -> bool {
        self.state == LocomotionState::Jumping
    }

    pub fn is_on_corner(&self) -> bool {
        self.state == LocomotionState::OnCorner
    }

    pub fn is_on_wall(&self) -> bool {
        matches!(
            self.state,
            LocomotionState::WallSticking | LocomotionState::WallSliding
        )
    }

    pub fn is_dashing(&self) -> bool {
        self.state == LocomotionState::Dashing
    }

    pub fn is_slipping(&self) -> bool {
        self.state == LocomotionState::Slipping
    }

    pub fn facing_left(&self) -> bool {
        self.facing_left
    }

    pub fn collisions(&self) -> CollisionFlags {
        self.surroundings.flags
    }

    pub fn slope_normal(&self) -> Vec2 {
        self.surroundings.slope_normal
    }

    /// Collider under the body, if grounded on anything.
    pub fn ground_collider(&self) -> Option<ColliderId> {
        self.surroundings.ground.map(|hit| hit.collider)
    }

    pub fn is_on_platform(&self) -> bool {
        self.surroundings.platform_velocity.is_some()
    }

    /// Vertical distance covered since the last jump started.
    pub fn amount_jumped_for(&self) -> f32 {
        self.amount_jumped_for
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Events fired during the last tick.
    pub fn events(&self) -> &[MotorEvent] {
        &self.events
    }

    pub fn view(&self) -> MotorView {
        MotorView {
            state: self.state,
            position: self.position,
            half_extents: self.half_extents,
            velocity: self.velocity,
            input: self.input,
            collisions: self.surroundings.flags,
            gravity: self.gravity(),
            fixed_dt: self.fixed_dt,
            on_platform: self.is_on_platform(),
        }
    }

    pub fn snapshot(&self) -> MotorSnapshot {
        let v = self.world_velocity();
        MotorSnapshot {
            x: self.position.x,
            y: self.position.y,
            vx: v.x,
            vy: v.y,
            state: self.state.code() as f32,
            collisions: self.surroundings.flags.0 as f32,
            facing_left: if self.facing_left { 1.0 } else { 0.0 },
            jumped_for: self.amount_jumped_for,
        }
    }
}

/// Horizontal speed after one tick of input: accelerate toward `input * max_speed`
/// when speeding up, brake over `stop_distance` otherwise.
fn horizontal_speed(
    current: f32,
    input: f32,
    max_speed: f32,
    time_to_speed: f32,
    stop_distance: f32,
    dt: f32,
) -> f32 {
    let target = input.clamp(-1.0, 1.0) * max_speed;
    let speeding_up = target != 0.0
        && (current == 0.0 || current.signum() == target.signum())
        && target.abs() > current.abs();
    let rate = if speeding_up {
        if time_to_speed > 0.0 {
            max_speed / time_to_speed
        } else {
            f32::INFINITY
        }
    } else if stop_distance > 0.0 {
        max_speed * max_speed / (2.0 * stop_distance)
    } else {
        f32::INFINITY
    };
    Motor::accelerate(current, rate, target, dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::LayerMask;
    use crate::core::level::Level;
    use crate::core::probe::EmptyProbe;
    use crate::extensions::plugin::Contribution;

    const DT: f32 = 0.02;

    fn flat_level() -> Level {
        let mut level = Level::new();
        level.add_box(Vec2::new(0.0, -0.5), Vec2::new(50.0, 0.5), LayerMask::STATIC);
        level
    }

    fn grounded_motor(level: &Level) -> Motor {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(0.0, 0.6), Vec2::splat(0.5));
        for _ in 0..20 {
            motor.tick(level, DT, MotorInput::default());
        }
        assert_eq!(motor.state(), LocomotionState::OnGround);
        motor
    }

    #[test]
    fn falls_and_lands() {
        let level = flat_level();
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(0.0, 3.0), Vec2::splat(0.5));
        let mut landed = false;
        for _ in 0..200 {
            motor.tick(&level, DT, MotorInput::default());
            landed |= motor.events().contains(&MotorEvent::Landed);
        }
        assert!(landed);
        assert!(motor.is_grounded());
        assert!((motor.position().y - 0.51).abs() < 1e-3);
        assert_eq!(motor.velocity(), Vec2::ZERO);
    }

    #[test]
    fn fall_speed_is_capped() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        for _ in 0..200 {
            motor.tick(&EmptyProbe, DT, MotorInput::default());
        }
        assert!((motor.velocity().y + motor.config().movement.fall_speed).abs() < 1e-4);
    }

    #[test]
    fn faster_than_terminal_decays_gradually() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        motor.set_velocity(Vec2::new(0.0, -30.0));
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        let vy = motor.velocity().y;
        assert!(vy > -30.0 && vy < -8.0, "vy = {}", vy);
    }

    #[test]
    fn walks_toward_ground_speed() {
        let level = flat_level();
        let mut motor = grounded_motor(&level);
        for _ in 0..20 {
            motor.tick(&level, DT, MotorInput::horizontal(1.0));
        }
        assert!((motor.velocity().x - 8.0).abs() < 1e-4);
        assert!(!motor.facing_left());
        for _ in 0..20 {
            motor.tick(&level, DT, MotorInput::default());
        }
        assert_eq!(motor.velocity().x, 0.0);
        assert!(motor.is_grounded());
    }

    #[test]
    fn accelerate_never_overshoots() {
        assert_eq!(Motor::accelerate(0.0, 100.0, 5.0, 0.1), 5.0);
        assert_eq!(Motor::accelerate(5.0, 10.0, 0.0, 0.1), 4.0);
        assert_eq!(Motor::accelerate(-1.0, 10.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn steep_slope_slips() {
        let mut level = flat_level();
        level.add_ramp(Vec2::new(0.0, 0.0), Vec2::new(2.0, 4.0), LayerMask::STATIC);
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(1.0, 3.5), Vec2::splat(0.25));
        let mut slipped = false;
        for _ in 0..100 {
            motor.tick(&level, DT, MotorInput::default());
            slipped |= motor.is_slipping();
        }
        assert!(slipped);
        assert!(motor.position().x < 1.0);
    }

    #[test]
    fn walkable_slope_is_ground() {
        let mut level = flat_level();
        level.add_ramp(Vec2::new(0.0, 0.0), Vec2::new(8.0, 2.0), LayerMask::STATIC);
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(4.0, 2.0), Vec2::splat(0.25));
        for _ in 0..60 {
            motor.tick(&level, DT, MotorInput::default());
        }
        assert_eq!(motor.state(), LocomotionState::OnGround);
        assert!(motor.slope_normal().x < 0.0);
        let x = motor.position().x;
        for _ in 0..10 {
            motor.tick(&level, DT, MotorInput::horizontal(1.0));
        }
        assert_eq!(motor.state(), LocomotionState::OnGround);
        assert!(motor.position().x > x);
    }

    #[test]
    fn rides_moving_platform() {
        let mut level = Level::new();
        let platform = level.add_box(Vec2::new(0.0, -0.5), Vec2::new(5.0, 0.5), LayerMask::MOVING_PLATFORM);
        level.set_velocity(platform, Vec2::new(1.0, 0.0));
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(0.0, 0.6), Vec2::splat(0.5));
        for _ in 0..10 {
            motor.tick(&level, DT, MotorInput::default());
            level.advance(DT);
        }
        let start = motor.position().x;
        for _ in 0..50 {
            motor.tick(&level, DT, MotorInput::default());
            level.advance(DT);
        }
        assert!(motor.is_on_platform());
        assert!(motor.is_grounded());
        assert!((motor.position().x - start - 1.0).abs() < 1e-3);
        assert_eq!(motor.velocity().x, 0.0);
        assert!((motor.world_velocity().x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn freedom_override_ignores_gravity() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        motor.set_freedom(true);
        let input = MotorInput {
            move_y: 1.0,
            ..MotorInput::default()
        };
        motor.tick(&EmptyProbe, DT, input);
        assert_eq!(motor.state(), LocomotionState::FreedomOverride);
        assert!((motor.velocity().y - 8.0).abs() < 1e-5);
        motor.set_freedom(false);
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert_eq!(motor.state(), LocomotionState::Falling);
    }

    #[test]
    fn inactive_motor_ignores_ticks() {
        let level = flat_level();
        let mut motor = grounded_motor(&level);
        motor.deactivate();
        let pos = motor.position();
        motor.tick(&EmptyProbe, DT, MotorInput::horizontal(1.0));
        assert_eq!(motor.position(), pos);
        motor.activate();
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(motor.position().y < pos.y);
    }

    #[test]
    fn changing_dt_rescales_timers() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        motor.jump.grace = FrameTimer::from_frames(10);
        motor.readjust_timers(1.0);
        assert_eq!(motor.jump.grace.frames(), 10);
        motor.readjust_timers(0.5);
        assert_eq!(motor.jump.grace.frames(), 5);
        motor.readjust_timers(2.0);
        assert_eq!(motor.jump.grace.frames(), 10);

        // Halving the tick length doubles the frames left.
        motor.tick(&EmptyProbe, DT / 2.0, MotorInput::default());
        assert_eq!(motor.jump.grace.frames(), 19);
    }

    struct Float;

    impl MotorPlugin for Float {
        fn contribute(&mut self, _view: &MotorView, velocity: Vec2) -> Contribution {
            Contribution::Handled(Vec2::new(velocity.x, 1.0))
        }

        fn overrides_gravity(&self, _view: &MotorView) -> bool {
            true
        }
    }

    #[test]
    fn plugin_overrides_velocity_before_move() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        let plugin = Rc::new(RefCell::new(Float));
        let handle = motor.attach(&plugin);
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!((motor.position().y - 0.02).abs() < 1e-6);
        assert!(motor.detach(handle));
        motor.tick(&EmptyProbe, DT, MotorInput::default());
        assert!(motor.velocity().y < 1.0);
    }

    #[test]
    fn deactivate_detaches_plugins() {
        let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        let plugin = Rc::new(RefCell::new(Float));
        motor.attach(&plugin);
        motor.deactivate();
        assert_eq!(motor.plugin_count(), 0);
    }

    fn count_airborne(motor: &mut Motor, level: &Level, ticks: usize) -> (usize, usize) {
        let mut falling = 0;
        let mut landed = 0;
        for _ in 0..ticks {
            motor.tick(level, DT, MotorInput::horizontal(1.0));
            if motor.is_falling() {
                falling += 1;
            }
            landed += motor.events().iter().filter(|e| **e == MotorEvent::Landed).count();
        }
        (falling, landed)
    }

    #[test]
    fn walks_down_onto_ramp_without_falling() {
        let mut level = Level::new();
        level.add_box(Vec2::new(-10.0, -0.5), Vec2::new(10.0, 0.5), LayerMask::STATIC);
        level.add_ramp(Vec2::new(0.0, 0.0), Vec2::new(6.0, -3.0), LayerMask::STATIC);
        level.add_box(Vec2::new(16.0, -3.5), Vec2::new(10.0, 0.5), LayerMask::STATIC);
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(-5.0, 0.51), Vec2::splat(0.5));
        motor.tick(&level, DT, MotorInput::default());
        assert_eq!(motor.state(), LocomotionState::OnGround);

        let (falling, landed) = count_airborne(&mut motor, &level, 90);
        assert_eq!(falling, 0);
        assert_eq!(landed, 0);
        assert!(motor.position().y < -2.0, "y = {}", motor.position().y);
        assert!(motor.is_grounded());
    }

    #[test]
    fn walks_over_ramp_crest_onto_plateau() {
        let mut level = Level::new();
        level.add_box(Vec2::new(-10.0, -0.5), Vec2::new(10.0, 0.5), LayerMask::STATIC);
        level.add_ramp(Vec2::new(0.0, 0.0), Vec2::new(4.0, 2.0), LayerMask::STATIC);
        level.add_box(Vec2::new(14.0, 1.0), Vec2::new(10.0, 1.0), LayerMask::STATIC);
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(-3.0, 0.51), Vec2::splat(0.5));
        motor.tick(&level, DT, MotorInput::default());

        let (falling, landed) = count_airborne(&mut motor, &level, 100);
        assert_eq!(falling, 0);
        assert_eq!(landed, 0);
        assert!(motor.position().x > 6.0);
        assert!((motor.position().y - 2.51).abs() < 0.02, "y = {}", motor.position().y);
        assert!(motor.velocity().y.abs() < 1e-4);
    }

    #[test]
    fn walking_off_a_cliff_still_falls() {
        let mut level = Level::new();
        level.add_box(Vec2::new(-10.0, -0.5), Vec2::new(10.0, 0.5), LayerMask::STATIC);
        level.add_box(Vec2::new(10.0, -5.5), Vec2::new(10.0, 0.5), LayerMask::STATIC);
        let mut motor = Motor::new(MotorConfig::default(), Vec2::new(-1.0, 0.51), Vec2::splat(0.5));
        motor.tick(&level, DT, MotorInput::default());
        let (falling, landed) = count_airborne(&mut motor, &level, 90);
        assert!(falling > 0);
        assert_eq!(landed, 1);
    }

    struct Lift;

    impl MotorPlugin for Lift {
        fn contribute(&mut self, _view: &MotorView, velocity: Vec2) -> Contribution {
            Contribution::Modified(Vec2::new(velocity.x, 2.0))
        }
    }

    #[test]
    fn plugin_can_lift_body_off_ground() {
        let level = flat_level();
        let mut motor = grounded_motor(&level);
        let start = motor.position().y;
        let plugin = Rc::new(RefCell::new(Lift));
        motor.attach(&plugin);
        motor.tick(&level, DT, MotorInput::default());
        assert!((motor.position().y - start - 0.04).abs() < 1e-5);
    }

    #[test]
    fn fast_fall_raises_gravity_and_cap() {
        let mut normal = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        let mut fast = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
        normal.tick(&EmptyProbe, DT, MotorInput::default());
        fast.tick(&EmptyProbe, DT, MotorInput::default().with_fall_fast(true));
        let g = normal.gravity() * DT;
        assert!((normal.velocity().y - g).abs() < 1e-5);
        let m = &fast.config().movement;
        assert!((fast.velocity().y - g * m.fast_fall_gravity_multiplier).abs() < 1e-4);

        for _ in 0..200 {
            normal.tick(&EmptyProbe, DT, MotorInput::default());
            fast.tick(&EmptyProbe, DT, MotorInput::default().with_fall_fast(true));
        }
        assert!((normal.velocity().y + normal.config().movement.fall_speed).abs() < 1e-4);
        assert!((fast.velocity().y + fast.config().movement.fast_fall_speed).abs() < 1e-4);
    }

    #[test]
    fn air_turn_can_be_disabled() {
        for change_direction in [true, false] {
            let mut motor = Motor::new(MotorConfig::default(), Vec2::ZERO, Vec2::splat(0.5));
            motor.config_mut().movement.change_direction_in_air = change_direction;
            motor.set_velocity(Vec2::new(4.0, 0.0));
            for _ in 0..10 {
                motor.tick(&EmptyProbe, DT, MotorInput::horizontal(-1.0));
            }
            if change_direction {
                assert!(motor.velocity().x < 4.0);
            } else {
                assert!((motor.velocity().x - 4.0).abs() < 1e-6);
            }
        }
    }
}
