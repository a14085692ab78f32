use std::collections::HashMap;

use glam::Vec2;
use rapier2d::parry::query::ShapeCastOptions;
use rapier2d::prelude::*;

use crate::api::types::{ColliderId, LayerMask};
use crate::core::probe::{cast_direction, Probe, RayHit};

// ---------------------------------------------------------------------------
// Conversion helpers between glam and nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn mask_to_groups(mask: LayerMask) -> InteractionGroups {
    InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask.0))
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How a level body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves.
    Fixed,
    /// Moved by its velocity each `step`. Motors standing on it ride along.
    Kinematic,
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
        }
    }
}

/// Shape description for a level collider.
#[derive(Debug, Clone, Copy)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
    CapsuleY { half_height: f32, radius: f32 },
    /// Local-space triangle, typically a ramp.
    Triangle { a: Vec2, b: Vec2, c: Vec2 },
}

impl ColliderDesc {
    fn build_collider(&self) -> ColliderBuilder {
        match *self {
            ColliderDesc::Ball { radius } => ColliderBuilder::ball(radius),
            ColliderDesc::Cuboid { half_width, half_height } => {
                ColliderBuilder::cuboid(half_width, half_height)
            }
            ColliderDesc::CapsuleY { half_height, radius } => {
                ColliderBuilder::capsule_y(half_height, radius)
            }
            ColliderDesc::Triangle { a, b, c } => ColliderBuilder::triangle(
                nalgebra::Point2::new(a.x, a.y),
                nalgebra::Point2::new(b.x, b.y),
                nalgebra::Point2::new(c.x, c.y),
            ),
        }
    }
}

/// Builder for describing a level body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub collider: ColliderDesc,
    pub layer: LayerMask,
}

impl BodyDesc {
    /// Static level geometry.
    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            kind: BodyKind::Fixed,
            position: Vec2::ZERO,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            collider,
            layer: LayerMask::STATIC,
        }
    }

    /// A moving platform.
    pub fn kinematic(collider: ColliderDesc) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            position: Vec2::ZERO,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            collider,
            layer: LayerMask::MOVING_PLATFORM,
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }
}

/// Handle pair for a level body, referencing Rapier internals.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsBody {
    pub id: ColliderId,
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Rapier2D-backed level geometry the motor can probe.
///
/// Only fixed and kinematic bodies live here; motors are not rigid bodies.
pub struct PhysicsWorld {
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    handles: HashMap<ColliderId, ColliderHandle>,
    next_id: u32,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            handles: HashMap::new(),
            next_id: 1,
        }
    }

    /// Set the integration timestep.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Create a level body + collider. The `ColliderId` is stored in the
    /// collider's `user_data` for hit lookups.
    pub fn create_body(&mut self, desc: &BodyDesc) -> PhysicsBody {
        let id = ColliderId(self.next_id);
        self.next_id += 1;

        let rb = RigidBodyBuilder::new(desc.kind.to_rapier())
            .translation(vec2_to_na(desc.position))
            .rotation(desc.rotation)
            .linvel(vec2_to_na(desc.velocity))
            .locked_axes(LockedAxes::ROTATION_LOCKED)
            .build();
        let body_handle = self.bodies.insert(rb);

        let collider = desc
            .collider
            .build_collider()
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(desc.layer.0),
                Group::ALL,
            ))
            .user_data(id.0 as u128)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.handles.insert(id, collider_handle);
        self.query_pipeline.update(&self.colliders);

        PhysicsBody {
            id,
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and all its colliders.
    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.handles.remove(&body.id);
        self.query_pipeline.update(&self.colliders);
    }

    /// Advance kinematic platforms by one tick and refresh the query structures.
    /// Call after the motors riding them have ticked.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &vector![0.0, 0.0],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Set the velocity of a kinematic platform.
    pub fn set_velocity(&mut self, body: &PhysicsBody, vel: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vec2_to_na(vel), true);
        }
    }

    /// Get the current position of a body.
    pub fn body_position(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Number of bodies in the level.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // -- private helpers --

    fn collider_id(&self, handle: ColliderHandle) -> Option<ColliderId> {
        let collider = self.colliders.get(handle)?;
        Some(ColliderId(collider.user_data as u32))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for PhysicsWorld {
    fn cast_ray(&self, origin: Vec2, dir: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let dir = cast_direction(dir, max_distance)?;
        let ray = Ray::new(point![origin.x, origin.y], vector![dir.x, dir.y]);
        let filter = QueryFilter::new().groups(mask_to_groups(mask));
        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(RayHit {
            collider: self.collider_id(handle)?,
            point: origin + dir * hit.time_of_impact,
            normal: na_to_vec2(&hit.normal),
            distance: hit.time_of_impact,
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
        let shape = Cuboid::new(vec2_to_na(half_extents.abs()));
        let shape_pos = Isometry::translation(center.x, center.y);
        let shape_vel = vec2_to_na(dir);
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };
        let filter = QueryFilter::new().groups(mask_to_groups(mask));
        let (handle, hit) = self.query_pipeline.cast_shape(
            &self.bodies,
            &self.colliders,
            &shape_pos,
            &shape_vel,
            &shape,
            options,
            filter,
        )?;
        Some(RayHit {
            collider: self.collider_id(handle)?,
            point: Vec2::new(hit.witness1.x, hit.witness1.y),
            normal: na_to_vec2(&hit.normal1),
            distance: hit.time_of_impact,
        })
    }

    fn platform_velocity(&self, collider: ColliderId) -> Option<Vec2> {
        let handle = self.handles.get(&collider)?;
        let parent = self.colliders.get(*handle)?.parent()?;
        let body = self.bodies.get(parent)?;
        if body.is_kinematic() {
            Some(na_to_vec2(body.linvel()))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(world: &mut PhysicsWorld) -> PhysicsBody {
        world.create_body(
            &BodyDesc::fixed(ColliderDesc::Cuboid {
                half_width: 10.0,
                half_height: 0.5,
            })
            .with_position(Vec2::new(0.0, -0.5)),
        )
    }

    #[test]
    fn create_and_remove_body() {
        let mut world = PhysicsWorld::new();
        let body = floor(&mut world);
        assert_eq!(world.body_count(), 1);
        world.remove_body(&body);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn ray_hits_fixed_floor() {
        let mut world = PhysicsWorld::new();
        let body = floor(&mut world);
        let hit = world
            .cast_ray(Vec2::new(0.0, 2.0), Vec2::NEG_Y, 5.0, LayerMask::ALL)
            .expect("floor below");
        assert_eq!(hit.collider, body.id);
        assert!((hit.distance - 2.0).abs() < 1e-3);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn layer_mask_filters_hits() {
        let mut world = PhysicsWorld::new();
        floor(&mut world);
        let hit = world.cast_ray(
            Vec2::new(0.0, 2.0),
            Vec2::NEG_Y,
            5.0,
            LayerMask::MOVING_PLATFORM,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn box_cast_stops_above_floor() {
        let mut world = PhysicsWorld::new();
        floor(&mut world);
        let hit = world
            .cast_box(Vec2::new(0.0, 3.0), Vec2::new(0.5, 1.0), Vec2::NEG_Y, 5.0, LayerMask::ALL)
            .expect("floor below");
        assert!((hit.distance - 2.0).abs() < 1e-2, "distance {}", hit.distance);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn kinematic_platform_reports_velocity_and_moves() {
        let mut world = PhysicsWorld::new();
        world.set_dt(0.1);
        let platform = world.create_body(
            &BodyDesc::kinematic(ColliderDesc::Cuboid {
                half_width: 1.0,
                half_height: 0.25,
            })
            .with_velocity(Vec2::new(2.0, 0.0)),
        );
        let fixed = floor(&mut world);

        assert_eq!(world.platform_velocity(platform.id), Some(Vec2::new(2.0, 0.0)));
        assert_eq!(world.platform_velocity(fixed.id), None);

        for _ in 0..10 {
            world.step();
        }
        let pos = world.body_position(&platform);
        assert!((pos.x - 2.0).abs() < 1e-2, "platform x = {}", pos.x);
    }
}
