use glam::Vec2;

use crate::api::types::{ColliderId, LayerMask};
use crate::core::geometry::{convex_hull, inflate_by_box, ray_polygon};
use crate::core::probe::{cast_direction, Probe, RayHit};

/// A convex collider in a `Level`.
#[derive(Debug, Clone)]
pub struct LevelCollider {
    pub id: ColliderId,
    pub layer: LayerMask,
    /// Counter-clockwise world-space vertices.
    vertices: Vec<Vec2>,
    /// Per-second velocity. Non-zero marks the collider as a moving platform.
    pub velocity: Vec2,
}

impl LevelCollider {
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn translate(&mut self, delta: Vec2) {
        for v in &mut self.vertices {
            *v += delta;
        }
    }

    pub fn center(&self) -> Vec2 {
        let sum: Vec2 = self.vertices.iter().copied().sum();
        sum / self.vertices.len().max(1) as f32
    }
}

/// Static and kinematic level geometry stored in a flat Vec.
/// Designed for small-to-medium collider counts (hundreds, not millions).
pub struct Level {
    colliders: Vec<LevelCollider>,
    next_id: u32,
}

impl Level {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a level with a specific collider capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            colliders: Vec::with_capacity(capacity),
            next_id: 1,
        }
    }

    /// Add an axis-aligned box.
    pub fn add_box(&mut self, center: Vec2, half_extents: Vec2, layer: LayerMask) -> ColliderId {
        let he = half_extents.abs();
        let vertices = vec![
            center + Vec2::new(-he.x, -he.y),
            center + Vec2::new(he.x, -he.y),
            center + Vec2::new(he.x, he.y),
            center + Vec2::new(-he.x, he.y),
        ];
        self.insert(vertices, layer)
    }

    /// Add a right-triangle ramp whose walkable face runs from `start` to `end`.
    /// The third corner sits under the higher endpoint.
    pub fn add_ramp(&mut self, start: Vec2, end: Vec2, layer: LayerMask) -> Option<ColliderId> {
        let (low, high) = if start.y <= end.y { (start, end) } else { (end, start) };
        self.add_polygon(&[low, high, Vec2::new(high.x, low.y)], layer)
    }

    /// Add the convex hull of `points`. `None` if the points are degenerate.
    pub fn add_polygon(&mut self, points: &[Vec2], layer: LayerMask) -> Option<ColliderId> {
        let hull = convex_hull(points);
        if hull.len() < 3 {
            log::warn!("level: ignoring degenerate polygon with {} points", points.len());
            return None;
        }
        Some(self.insert(hull, layer))
    }

    fn insert(&mut self, vertices: Vec<Vec2>, layer: LayerMask) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.colliders.push(LevelCollider {
            id,
            layer,
            vertices,
            velocity: Vec2::ZERO,
        });
        id
    }

    /// Remove a collider by ID. Returns the removed collider if found.
    pub fn remove(&mut self, id: ColliderId) -> Option<LevelCollider> {
        let idx = self.colliders.iter().position(|c| c.id == id)?;
        Some(self.colliders.swap_remove(idx))
    }

    pub fn get(&self, id: ColliderId) -> Option<&LevelCollider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut LevelCollider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    /// Set the per-second velocity of a collider (moving platform).
    pub fn set_velocity(&mut self, id: ColliderId, velocity: Vec2) {
        if let Some(c) = self.get_mut(id) {
            c.velocity = velocity;
        }
    }

    /// Move every collider by its velocity. Call once per tick, after the
    /// motors riding these colliders have ticked.
    pub fn advance(&mut self, dt: f32) {
        for c in &mut self.colliders {
            if c.velocity != Vec2::ZERO {
                let delta = c.velocity * dt;
                c.translate(delta);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelCollider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    /// Nearest hit over all colliders accepted by `mask`, with `shape` turning a
    /// collider's vertices into the polygon the ray is tested against.
    fn nearest(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
        shape: impl Fn(&LevelCollider) -> Option<(f32, Vec2)>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for c in self.colliders.iter().filter(|c| mask.intersects(c.layer)) {
            let Some((distance, normal)) = shape(c) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    collider: c.id,
                    point: origin + dir * distance,
                    normal,
                    distance,
                });
            }
        }
        best
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for Level {
    fn cast_ray(&self, origin: Vec2, dir: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let dir = cast_direction(dir, max_distance)?;
        self.nearest(origin, dir, max_distance, mask, |c| {
            ray_polygon(origin, dir, max_distance, &c.vertices)
        })
    }

    fn cast_box(
        &self,
        center: Vec2,
        half_extents: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = cast_direction(dir, max_distance)?;
        let he = half_extents.abs();
        let mut hit = self.nearest(center, dir, max_distance, mask, |c| {
            let inflated = inflate_by_box(&c.vertices, he);
            ray_polygon(center, dir, max_distance, &inflated)
        })?;
        // Move the contact from the box center onto the touching face.
        let reach = hit.normal.x.abs() * he.x + hit.normal.y.abs() * he.y;
        hit.point -= hit.normal * reach;
        Some(hit)
    }

    fn platform_velocity(&self, collider: ColliderId) -> Option<Vec2> {
        self.get(collider)
            .filter(|c| c.layer.intersects(LayerMask::MOVING_PLATFORM) || c.velocity != Vec2::ZERO)
            .map(|c| c.velocity)
    }
}
