pub mod geometry;
pub mod level;
#[cfg(feature = "physics")]
pub mod physics;
pub mod probe;
pub mod time;
