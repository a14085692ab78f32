use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier of a collider inside a probe implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u32);

/// Layer bits used to filter which colliders a probe considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Static level geometry.
    pub const STATIC: Self = Self(1 << 0);
    /// Kinematic bodies the motor can ride.
    pub const MOVING_PLATFORM: Self = Self(1 << 1);

    /// Mask with only bit `index` set.
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index & 31))
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Which sides of the body touch the environment this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionFlags(pub u8);

impl CollisionFlags {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const TOP: Self = Self(1 << 2);
    pub const BOTTOM: Self = Self(1 << 3);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The locomotion mode of a motor. Exactly one is active at any tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    OnGround,
    #[default]
    Falling,
    Jumping,
    /// Standing on a slope steeper than the walkable angle.
    Slipping,
    /// Holding onto a ledge.
    OnCorner,
    /// Briefly held in place against a wall.
    WallSticking,
    /// Descending along a wall at a capped speed.
    WallSliding,
    Dashing,
    /// Host-requested free movement (ladders, cutscenes). No gravity.
    FreedomOverride,
}

impl LocomotionState {
    /// Numeric tag used in flat snapshots.
    pub fn code(self) -> u32 {
        match self {
            LocomotionState::OnGround => 0,
            LocomotionState::Falling => 1,
            LocomotionState::Jumping => 2,
            LocomotionState::Slipping => 3,
            LocomotionState::OnCorner => 4,
            LocomotionState::WallSticking => 5,
            LocomotionState::WallSliding => 6,
            LocomotionState::Dashing => 7,
            LocomotionState::FreedomOverride => 8,
        }
    }

    pub fn is_wall_state(self) -> bool {
        matches!(
            self,
            LocomotionState::OnCorner | LocomotionState::WallSticking | LocomotionState::WallSliding
        )
    }
}

/// Per-tick control intents supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorInput {
    /// Horizontal intent in [-1, 1].
    pub move_x: f32,
    /// Vertical intent in [-1, 1], only used under the freedom override.
    pub move_y: f32,
    /// Fall faster while airborne.
    pub fall_fast: bool,
    /// Whether the jump button is still down. Releasing it ends the extra-height window.
    pub jump_held: bool,
}

impl MotorInput {
    pub fn horizontal(move_x: f32) -> Self {
        Self {
            move_x,
            ..Self::default()
        }
    }

    pub fn with_jump_held(mut self, held: bool) -> Self {
        self.jump_held = held;
        self
    }

    pub fn with_fall_fast(mut self, fall_fast: bool) -> Self {
        self.fall_fast = fall_fast;
        self
    }
}

/// Notifications fired by a motor during its tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorEvent {
    Jump,
    AirJump,
    /// `normal` points away from the wall that was jumped off.
    WallJump { normal: Vec2 },
    CornerJump,
    Dash { direction: Vec2 },
    DashEnd,
    Landed,
}

impl MotorEvent {
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            MotorEvent::Jump | MotorEvent::AirJump | MotorEvent::WallJump { .. } | MotorEvent::CornerJump
        )
    }

    pub fn to_flat(&self) -> FlatEvent {
        let (kind, a, b) = match *self {
            MotorEvent::Jump => (1.0, 0.0, 0.0),
            MotorEvent::AirJump => (2.0, 0.0, 0.0),
            MotorEvent::WallJump { normal } => (3.0, normal.x, normal.y),
            MotorEvent::CornerJump => (4.0, 0.0, 0.0),
            MotorEvent::Dash { direction } => (5.0, direction.x, direction.y),
            MotorEvent::DashEnd => (6.0, 0.0, 0.0),
            MotorEvent::Landed => (7.0, 0.0, 0.0),
        };
        FlatEvent { kind, a, b, c: 0.0 }
    }
}

/// A motor event laid out for a flat f32 buffer.
/// `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FlatEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl FlatEvent {
    pub const FLOATS: usize = 4;
}

/// Motor state after a tick, laid out for a flat f32 buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MotorSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub state: f32,
    pub collisions: f32,
    pub facing_left: f32,
    pub jumped_for: f32,
}

impl MotorSnapshot {
    pub const FLOATS: usize = 8;
}
