// extensions/mod.rs
//
// Optional pieces layered on the motor: dash easing curves and the plugin
// hook chain. The motor only sees plugins through `MotorPlugin`.

pub mod easing;
pub mod plugin;

pub use easing::Easing;
pub use plugin::{Contribution, MotorPlugin, MotorView, PluginChain, PluginHandle};
