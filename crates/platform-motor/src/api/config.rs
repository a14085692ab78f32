use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::types::LayerMask;
use crate::extensions::easing::Easing;

/// Tunables for one motor. Every field is read at the point of use, so
/// changing a value between ticks takes effect on the next evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub movement: MovementConfig,
    pub jump: JumpConfig,
    pub wall: WallConfig,
    pub dash: DashConfig,
    pub slopes: SlopeConfig,
    pub environment: EnvironmentConfig,
}

/// Horizontal and vertical speed limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub ground_speed: f32,
    /// Seconds to reach `ground_speed` from rest.
    pub time_to_ground_speed: f32,
    /// Distance covered while braking from `ground_speed` to rest.
    pub ground_stop_distance: f32,
    pub air_speed: f32,
    pub time_to_air_speed: f32,
    pub air_stop_distance: f32,
    /// Whether input opposite to the current horizontal velocity is honored in the air.
    pub change_direction_in_air: bool,
    /// Terminal fall speed (positive).
    pub fall_speed: f32,
    pub fast_fall_speed: f32,
    pub fast_fall_gravity_multiplier: f32,
    /// Rate (1/s) at which a body falling faster than terminal speed decays back to it.
    pub terminal_approach_rate: f32,
    pub gravity_multiplier: f32,
    /// Seconds horizontal input is ignored after a wall or corner jump.
    pub ignore_movement_after_jump: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            ground_speed: 8.0,
            time_to_ground_speed: 0.1,
            ground_stop_distance: 0.333,
            air_speed: 5.0,
            time_to_air_speed: 0.2,
            air_stop_distance: 2.0,
            change_direction_in_air: true,
            fall_speed: 8.0,
            fast_fall_speed: 16.0,
            fast_fall_gravity_multiplier: 4.0,
            terminal_approach_rate: 10.0,
            gravity_multiplier: 4.0,
            ignore_movement_after_jump: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub enabled: bool,
    /// Apex height of a ground jump.
    pub height: f32,
    /// Extra height gained while the jump button stays held.
    pub extra_height: f32,
    pub num_air_jumps: u32,
    /// Seconds a press stays buffered before it can be honored.
    pub window_when_activated: f32,
    /// Grace seconds after leaving the ground, a wall or a corner.
    pub window_when_falling: f32,
    pub corner_jump_multiplier: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 1.5,
            extra_height: 1.0,
            num_air_jumps: 1,
            window_when_activated: 0.2,
            window_when_falling: 0.2,
            corner_jump_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    pub enable_wall_jumps: bool,
    pub wall_jump_multiplier: f32,
    /// Launch angle from the horizontal, in degrees.
    pub wall_jump_angle: f32,
    pub enable_wall_sticks: bool,
    pub wall_sticky_duration: f32,
    pub enable_wall_slides: bool,
    pub wall_slide_speed: f32,
    pub time_to_wall_slide_speed: f32,
    pub enable_corner_grabs: bool,
    pub corner_grab_duration: f32,
    /// How far below the body's top a ledge may sit and still count as a corner.
    pub corner_distance_check: f32,
    /// Minimum |move_x| that counts as pressing into a wall.
    pub valid_input_threshold: f32,
    /// Seconds before a wall can be engaged again after leaving it.
    pub interaction_cooldown: f32,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            enable_wall_jumps: true,
            wall_jump_multiplier: 1.0,
            wall_jump_angle: 70.0,
            enable_wall_sticks: true,
            wall_sticky_duration: 0.5,
            enable_wall_slides: true,
            wall_slide_speed: 5.0,
            time_to_wall_slide_speed: 0.1,
            enable_corner_grabs: true,
            corner_grab_duration: 0.5,
            corner_distance_check: 0.2,
            valid_input_threshold: 0.2,
            interaction_cooldown: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub enabled: bool,
    pub distance: f32,
    pub duration: f32,
    pub cooldown: f32,
    pub easing: Easing,
    /// Seconds gravity stays off after a dash ends.
    pub gravity_delay: f32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 3.0,
            duration: 0.2,
            cooldown: 0.76,
            easing: Easing::QuadOut,
            gravity_delay: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    pub enabled: bool,
    /// Steepest walkable slope, in degrees. Steeper ground makes the body slip.
    pub max_walkable_angle: f32,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_walkable_angle: 50.0,
        }
    }
}

/// World constants and collision query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Signed vertical gravity. Negative pulls down.
    pub gravity: f32,
    /// Tick length assumed until the first `tick` supplies one.
    pub fixed_dt: f32,
    /// How far each side is probed for contact.
    pub check_distance: f32,
    /// Gap kept between the body and geometry after a move.
    pub min_distance_from_env: f32,
    pub max_move_iterations: u32,
    pub collision_mask: LayerMask,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            fixed_dt: 0.02,
            check_distance: 0.04,
            min_distance_from_env: 0.01,
            max_move_iterations: 4,
            collision_mask: LayerMask::ALL,
        }
    }
}

impl MotorConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("parse motor config")?;
        config.validate().context("invalid motor config")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.movement;
        positive("movement.ground_speed", m.ground_speed)?;
        positive("movement.air_speed", m.air_speed)?;
        positive("movement.fall_speed", m.fall_speed)?;
        positive("movement.fast_fall_speed", m.fast_fall_speed)?;
        positive("movement.gravity_multiplier", m.gravity_multiplier)?;
        positive("movement.fast_fall_gravity_multiplier", m.fast_fall_gravity_multiplier)?;
        non_negative("movement.time_to_ground_speed", m.time_to_ground_speed)?;
        non_negative("movement.ground_stop_distance", m.ground_stop_distance)?;
        non_negative("movement.time_to_air_speed", m.time_to_air_speed)?;
        non_negative("movement.air_stop_distance", m.air_stop_distance)?;
        non_negative("movement.terminal_approach_rate", m.terminal_approach_rate)?;
        non_negative("movement.ignore_movement_after_jump", m.ignore_movement_after_jump)?;

        let j = &self.jump;
        positive("jump.height", j.height)?;
        non_negative("jump.extra_height", j.extra_height)?;
        non_negative("jump.window_when_activated", j.window_when_activated)?;
        non_negative("jump.window_when_falling", j.window_when_falling)?;
        positive("jump.corner_jump_multiplier", j.corner_jump_multiplier)?;

        let w = &self.wall;
        positive("wall.wall_jump_multiplier", w.wall_jump_multiplier)?;
        if !(0.0..=90.0).contains(&w.wall_jump_angle) {
            return Err(anyhow!("wall.wall_jump_angle must be within [0, 90] degrees"));
        }
        non_negative("wall.wall_sticky_duration", w.wall_sticky_duration)?;
        positive("wall.wall_slide_speed", w.wall_slide_speed)?;
        non_negative("wall.time_to_wall_slide_speed", w.time_to_wall_slide_speed)?;
        non_negative("wall.corner_grab_duration", w.corner_grab_duration)?;
        non_negative("wall.corner_distance_check", w.corner_distance_check)?;
        non_negative("wall.interaction_cooldown", w.interaction_cooldown)?;
        if !(0.0..=1.0).contains(&w.valid_input_threshold) {
            return Err(anyhow!("wall.valid_input_threshold must be within [0, 1]"));
        }

        let d = &self.dash;
        positive("dash.distance", d.distance)?;
        positive("dash.duration", d.duration)?;
        non_negative("dash.cooldown", d.cooldown)?;
        non_negative("dash.gravity_delay", d.gravity_delay)?;

        if !(0.0..90.0).contains(&self.slopes.max_walkable_angle) {
            return Err(anyhow!("slopes.max_walkable_angle must be within [0, 90) degrees"));
        }

        let e = &self.environment;
        if !(e.gravity.is_finite() && e.gravity <= 0.0) {
            return Err(anyhow!("environment.gravity must be finite and non-positive"));
        }
        if !(e.fixed_dt > 0.0 && e.fixed_dt <= 1.0) {
            return Err(anyhow!("environment.fixed_dt out of range"));
        }
        positive("environment.check_distance", e.check_distance)?;
        non_negative("environment.min_distance_from_env", e.min_distance_from_env)?;
        if e.min_distance_from_env >= e.check_distance {
            return Err(anyhow!(
                "environment.min_distance_from_env must be smaller than check_distance"
            ));
        }
        if e.max_move_iterations == 0 {
            return Err(anyhow!("environment.max_move_iterations must be at least 1"));
        }
        Ok(())
    }

    /// Initial jump speed for a jump of `height`.
    pub fn jump_speed(&self, height: f32) -> f32 {
        let g = self.environment.gravity * self.movement.gravity_multiplier;
        (-2.0 * height * g).max(0.0).sqrt()
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{name} must be positive, got {value}"))
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{name} must be non-negative, got {value}"))
    }
}
