//! Contact probing and swept movement for the motor's box.

use glam::Vec2;

use crate::api::types::{CollisionFlags, LayerMask};
use crate::core::probe::{Probe, RayHit};

/// Minimum upward normal component for a contact below the body to count as ground.
const FLOOR_MIN_NORMAL_Y: f32 = 1.0e-3;
/// Displacements shorter than this end the sweep.
const MIN_MOVE: f32 = 1.0e-6;

/// Query parameters derived from the motor config once per tick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProbeSettings {
    pub mask: LayerMask,
    pub check_distance: f32,
    /// Extra downward reach so a platform moving away still counts as ground.
    pub ground_reach: f32,
    pub skin: f32,
    /// Contacts whose normal has a smaller y than this count as walls.
    pub wall_max_normal_y: f32,
    pub corner_distance_check: f32,
    pub max_iterations: u32,
}

/// What touches the body this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Surroundings {
    pub flags: CollisionFlags,
    pub ground: Option<RayHit>,
    /// Ground normal, `Vec2::Y` when airborne.
    pub slope_normal: Vec2,
    /// Velocity of the body owning the ground collider, if it moves.
    pub platform_velocity: Option<Vec2>,
    pub corner_left: bool,
    pub corner_right: bool,
}

impl Default for Surroundings {
    fn default() -> Self {
        Self {
            flags: CollisionFlags::NONE,
            ground: None,
            slope_normal: Vec2::Y,
            platform_velocity: None,
            corner_left: false,
            corner_right: false,
        }
    }
}

impl Surroundings {
    pub fn platform_velocity(&self) -> Vec2 {
        self.platform_velocity.unwrap_or(Vec2::ZERO)
    }
}

/// Classify a contact normal into the side of the body it blocks.
fn side_of(normal: Vec2, wall_max_normal_y: f32) -> CollisionFlags {
    if normal.y > FLOOR_MIN_NORMAL_Y && normal.y >= wall_max_normal_y {
        CollisionFlags::BOTTOM
    } else if normal.y < -wall_max_normal_y {
        CollisionFlags::TOP
    } else if normal.x > 0.0 {
        CollisionFlags::LEFT
    } else if normal.x < 0.0 {
        CollisionFlags::RIGHT
    } else if normal.y > 0.0 {
        CollisionFlags::BOTTOM
    } else {
        CollisionFlags::TOP
    }
}

/// Probe the four sides of the box and look for ledges next to it.
pub(crate) fn resolve<P: Probe + ?Sized>(
    probe: &P,
    center: Vec2,
    half_extents: Vec2,
    settings: &ProbeSettings,
) -> Surroundings {
    let mut out = Surroundings::default();
    let reach = settings.check_distance;

    let down = probe.cast_box(
        center,
        half_extents,
        Vec2::NEG_Y,
        reach + settings.ground_reach.max(0.0),
        settings.mask,
    );
    if let Some(hit) = down.filter(|h| h.normal.y > FLOOR_MIN_NORMAL_Y) {
        out.flags.insert(CollisionFlags::BOTTOM);
        out.slope_normal = hit.normal;
        out.platform_velocity = probe.platform_velocity(hit.collider);
        out.ground = Some(hit);
    }

    if let Some(hit) = probe.cast_box(center, half_extents, Vec2::Y, reach, settings.mask) {
        if hit.normal.y < 0.0 {
            out.flags.insert(CollisionFlags::TOP);
        }
    }

    for (dir, flag) in [(Vec2::NEG_X, CollisionFlags::LEFT), (Vec2::X, CollisionFlags::RIGHT)] {
        let Some(hit) = probe.cast_box(center, half_extents, dir, reach, settings.mask) else {
            continue;
        };
        let faces_body = hit.normal.dot(dir) < 0.0;
        if faces_body && hit.normal.y < settings.wall_max_normal_y {
            out.flags.insert(flag);
        }
    }

    out.corner_left = out.flags.contains(CollisionFlags::LEFT)
        && is_corner(probe, center, half_extents, Vec2::NEG_X, settings);
    out.corner_right = out.flags.contains(CollisionFlags::RIGHT)
        && is_corner(probe, center, half_extents, Vec2::X, settings);

    log::trace!(
        "surroundings at {:?}: flags {:#06b}, slope {:?}, platform {:?}",
        center,
        out.flags.0,
        out.slope_normal,
        out.platform_velocity
    );
    out
}

/// Walkable ground within `reach` below the body, for keeping a walking body
/// attached over slope changes.
pub(crate) fn ground_below<P: Probe + ?Sized>(
    probe: &P,
    center: Vec2,
    half_extents: Vec2,
    reach: f32,
    settings: &ProbeSettings,
) -> Option<RayHit> {
    probe
        .cast_box(center, half_extents, Vec2::NEG_Y, reach, settings.mask)
        .filter(|hit| hit.normal.y > FLOOR_MIN_NORMAL_Y && hit.normal.y >= settings.wall_max_normal_y)
}

/// A ledge: a ray level with the top of the body passes over the wall,
/// one slightly lower hits it.
fn is_corner<P: Probe + ?Sized>(
    probe: &P,
    center: Vec2,
    half_extents: Vec2,
    dir: Vec2,
    settings: &ProbeSettings,
) -> bool {
    let length = half_extents.x + settings.check_distance;
    let top = Vec2::new(center.x, center.y + half_extents.y);
    let above = probe.cast_ray(top, dir, length, settings.mask);
    if above.is_some() {
        return false;
    }
    let below = top - Vec2::new(0.0, settings.corner_distance_check);
    probe
        .cast_ray(below, dir, length, settings.mask)
        .is_some_and(|hit| hit.normal.dot(dir) < 0.0)
}

/// Outcome of a swept move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MoveResult {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Sides that stopped part of the displacement.
    pub blocked: CollisionFlags,
}

/// Sweep the box along `displacement`, stopping `skin` short of contacts and
/// sliding the remainder along each surface. The velocity component into a
/// blocking surface is removed. A box embedded in geometry only moves along
/// directions that separate it from the contact.
pub(crate) fn sweep<P: Probe + ?Sized>(
    probe: &P,
    center: Vec2,
    half_extents: Vec2,
    displacement: Vec2,
    velocity: Vec2,
    settings: &ProbeSettings,
) -> MoveResult {
    let mut position = center;
    let mut velocity = velocity;
    let mut remaining = displacement;
    let mut blocked = CollisionFlags::NONE;

    if !displacement.is_finite() {
        log::warn!("sweep: ignoring non-finite displacement {:?}", displacement);
        return MoveResult {
            position,
            velocity,
            blocked,
        };
    }

    for _ in 0..settings.max_iterations.max(1) {
        let length = remaining.length();
        if length <= MIN_MOVE {
            break;
        }
        let dir = remaining / length;
        let Some(hit) = probe.cast_box(
            position,
            half_extents,
            dir,
            length + settings.skin,
            settings.mask,
        ) else {
            position += remaining;
            remaining = Vec2::ZERO;
            break;
        };

        if hit.distance <= 0.0 && dir.dot(hit.normal) >= 0.0 {
            position += remaining;
            remaining = Vec2::ZERO;
            break;
        }

        let travel = (hit.distance - settings.skin).clamp(0.0, length);
        position += dir * travel;
        remaining -= dir * travel;

        let into = remaining.dot(hit.normal);
        if into < 0.0 {
            remaining -= hit.normal * into;
        }
        let v_into = velocity.dot(hit.normal);
        if v_into < 0.0 {
            velocity -= hit.normal * v_into;
        }
        blocked.insert(side_of(hit.normal, settings.wall_max_normal_y));
    }

    if remaining.length() > MIN_MOVE {
        log::trace!("sweep: {:?} left unresolved after iterations", remaining);
    }

    MoveResult {
        position,
        velocity,
        blocked,
    }
}
