pub mod api;
pub mod core;
pub mod extensions;
pub mod motor;

// Re-export key types at crate root for convenience
pub use api::config::{
    DashConfig, EnvironmentConfig, JumpConfig, MotorConfig, MovementConfig, SlopeConfig,
    WallConfig,
};
pub use api::types::{
    ColliderId, CollisionFlags, FlatEvent, LayerMask, LocomotionState, MotorEvent, MotorInput,
    MotorSnapshot,
};
pub use core::level::{Level, LevelCollider};
pub use core::probe::{EmptyProbe, Probe, RayHit};
pub use core::time::{frame_count, FixedTimestep, FrameTimer};
pub use motor::jump::JumpType;
pub use motor::wall::WallSide;
pub use motor::Motor;

#[cfg(feature = "physics")]
pub use core::physics::{BodyDesc, BodyKind, ColliderDesc, PhysicsBody, PhysicsWorld};

// Extensions: easing curves and the plugin chain
pub use extensions::{Contribution, Easing, MotorPlugin, MotorView, PluginChain, PluginHandle};
