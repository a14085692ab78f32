//! Environment queries the motor issues each tick.
//!
//! A `Probe` is a read-only view of the world: directional ray casts, swept
//! box casts, and the velocity of whatever kinematic body a collider belongs to.
//! Degenerate queries (zero-length or non-finite direction, non-positive
//! distance) report no contact instead of failing.

use glam::Vec2;

use crate::api::types::{ColliderId, LayerMask};

/// Nearest contact returned by a cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderId,
    /// Contact point in world space.
    pub point: Vec2,
    /// Surface normal at the contact, pointing away from the collider.
    pub normal: Vec2,
    /// Distance travelled along the cast direction before contact.
    /// Zero when the cast starts inside geometry.
    pub distance: f32,
}

pub trait Probe {
    /// Cast a ray from `origin` along `dir` (any length, normalized internally).
    fn cast_ray(&self, origin: Vec2, dir: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit>;

    /// Sweep an axis-aligned box centered at `center` along `dir`.
    fn cast_box(
        &self,
        center: Vec2,
        half_extents: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Per-second velocity of the body owning `collider`, or `None` if static.
    fn platform_velocity(&self, collider: ColliderId) -> Option<Vec2>;
}

/// Validate and normalize a cast direction. `None` for degenerate input.
pub fn cast_direction(dir: Vec2, max_distance: f32) -> Option<Vec2> {
    if !max_distance.is_finite() || max_distance <= 0.0 || !dir.is_finite() {
        return None;
    }
    dir.try_normalize()
}

/// A probe with nothing in it. Every cast misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProbe;

impl Probe for EmptyProbe {
    fn cast_ray(&self, _origin: Vec2, _dir: Vec2, _max_distance: f32, _mask: LayerMask) -> Option<RayHit> {
        None
    }

    fn cast_box(
        &self,
        _center: Vec2,
        _half_extents: Vec2,
        _dir: Vec2,
        _max_distance: f32,
        _mask: LayerMask,
    ) -> Option<RayHit> {
        None
    }

    fn platform_velocity(&self, _collider: ColliderId) -> Option<Vec2> {
        None
    }
}
