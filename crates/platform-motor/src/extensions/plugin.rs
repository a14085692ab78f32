// extensions/plugin.rs
//
// External velocity contributors. The motor keeps non-owning references so a
// plugin's owner decides its lifetime; plugins detach themselves before drop.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;

use crate::api::types::{CollisionFlags, LocomotionState, MotorEvent, MotorInput};

/// Read-only picture of the motor handed to plugins each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorView {
    pub state: LocomotionState,
    pub position: Vec2,
    pub half_extents: Vec2,
    /// Velocity relative to any attached platform.
    pub velocity: Vec2,
    pub input: MotorInput,
    pub collisions: CollisionFlags,
    /// Signed gravity after the motor's multiplier.
    pub gravity: f32,
    pub fixed_dt: f32,
    pub on_platform: bool,
}

/// Result of one plugin's turn in the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// Velocity unchanged, keep evaluating.
    Continue,
    /// Velocity replaced, keep evaluating.
    Modified(Vec2),
    /// Velocity replaced, later plugins are skipped.
    Handled(Vec2),
    /// Velocity unchanged, later plugins are skipped.
    Stop,
}

pub trait MotorPlugin {
    /// Adjust the tentative velocity for this tick.
    fn contribute(&mut self, view: &MotorView, velocity: Vec2) -> Contribution;

    /// Whether the motor should skip gravity this tick (buoyancy and the like).
    fn overrides_gravity(&self, _view: &MotorView) -> bool {
        false
    }

    fn on_event(&mut self, _event: &MotorEvent) {}

    fn on_attach(&mut self) {}

    fn on_detach(&mut self) {}
}

/// Registration token returned by `PluginChain::attach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginHandle(u32);

struct PluginEntry {
    handle: PluginHandle,
    plugin: Weak<RefCell<dyn MotorPlugin>>,
}

/// Ordered, non-owning list of plugins.
#[derive(Default)]
pub struct PluginChain {
    entries: Vec<PluginEntry>,
    next_handle: u32,
}

impl PluginChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin. The chain only keeps a weak reference.
    pub fn attach<P: MotorPlugin + 'static>(&mut self, plugin: &Rc<RefCell<P>>) -> PluginHandle {
        let handle = PluginHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let weak = Rc::downgrade(plugin);
        let weak: Weak<RefCell<dyn MotorPlugin>> = weak;
        plugin.borrow_mut().on_attach();
        self.entries.push(PluginEntry { handle, plugin: weak });
        log::debug!("plugin {:?} attached ({} total)", handle, self.entries.len());
        handle
    }

    /// Remove a plugin. Returns false if the handle is unknown.
    pub fn detach(&mut self, handle: PluginHandle) -> bool {
        let Some(idx) = self.entries.iter().position(|e| e.handle == handle) else {
            return false;
        };
        let entry = self.entries.remove(idx);
        if let Some(plugin) = entry.plugin.upgrade() {
            if let Ok(mut p) = plugin.try_borrow_mut() {
                p.on_detach();
            }
        }
        log::debug!("plugin {:?} detached", handle);
        true
    }

    pub fn detach_all(&mut self) {
        let handles: Vec<PluginHandle> = self.entries.iter().map(|e| e.handle).collect();
        for handle in handles {
            self.detach(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the chain in registration order. The first `Handled` or `Stop`
    /// ends evaluation for this tick.
    pub fn contribute(&mut self, view: &MotorView, velocity: Vec2) -> Vec2 {
        self.prune();
        let mut velocity = velocity;
        for entry in &self.entries {
            let Some(plugin) = entry.plugin.upgrade() else {
                continue;
            };
            let Ok(mut plugin) = plugin.try_borrow_mut() else {
                log::warn!("plugin {:?} is busy; skipped this tick", entry.handle);
                continue;
            };
            match plugin.contribute(view, velocity) {
                Contribution::Continue => {}
                Contribution::Modified(v) => velocity = v,
                Contribution::Handled(v) => {
                    velocity = v;
                    break;
                }
                Contribution::Stop => break,
            }
        }
        velocity
    }

    /// True if any live plugin asks for gravity to be skipped.
    pub fn overrides_gravity(&self, view: &MotorView) -> bool {
        self.entries.iter().any(|e| {
            e.plugin
                .upgrade()
                .and_then(|p| p.try_borrow().ok().map(|p| p.overrides_gravity(view)))
                .unwrap_or(false)
        })
    }

    pub fn notify(&mut self, event: &MotorEvent) {
        for entry in &self.entries {
            if let Some(plugin) = entry.plugin.upgrade() {
                match plugin.try_borrow_mut() {
                    Ok(mut p) => p.on_event(event),
                    Err(_) => log::warn!("plugin {:?} is busy; dropped {:?}", entry.handle, event),
                }
            }
        }
    }

    /// Drop entries whose owner went away without detaching.
    fn prune(&mut self) {
        self.entries.retain(|e| {
            let alive = e.plugin.strong_count() > 0;
            if !alive {
                log::warn!("plugin {:?} dropped without detaching; removed", e.handle);
            }
            alive
        });
    }
}
