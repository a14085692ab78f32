//! WASM bridge: one motor and its level, driven from a browser host.
//!
//! The host calls `motor_init` once with a JSON config, builds the level,
//! then calls `motor_tick` every animation frame with the frame delta.

pub mod runner;

pub use runner::MotorRunner;

use std::cell::RefCell;

use glam::Vec2;
use platform_motor::{ColliderId, MotorConfig, MotorInput};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<MotorRunner>> = const { RefCell::new(None) };
}

/// Run `f` against the runner, or return `default` before `motor_init`.
fn with_runner<R>(default: R, f: impl FnOnce(&mut MotorRunner) -> R) -> R {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => f(runner),
        None => {
            log::warn!("motor not initialized, call motor_init() first");
            default
        }
    })
}

/// Create the motor. An empty string uses the default config. Returns false
/// and logs to the console when the config is rejected.
#[wasm_bindgen]
pub fn motor_init(config_json: &str, x: f32, y: f32, half_w: f32, half_h: f32) -> bool {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        MotorConfig::default()
    } else {
        match MotorConfig::from_json(config_json) {
            Ok(config) => config,
            Err(err) => {
                web_sys::console::error_1(&JsValue::from_str(&format!("{:#}", err)));
                return false;
            }
        }
    };

    let runner = MotorRunner::new(config, Vec2::new(x, y), Vec2::new(half_w, half_h));
    RUNNER.with(|cell| *cell.borrow_mut() = Some(runner));
    log::info!("platform-motor: initialized");
    true
}

#[wasm_bindgen]
pub fn motor_tick(frame_dt: f32) -> u32 {
    with_runner(0, |r| r.tick(frame_dt))
}

#[wasm_bindgen]
pub fn motor_set_fixed_dt(dt: f32) {
    with_runner((), |r| r.set_fixed_dt(dt));
}

// ---- Level ----

/// Returns the collider id, or -1 before init.
#[wasm_bindgen]
pub fn level_add_box(x: f32, y: f32, half_w: f32, half_h: f32, moving: bool) -> i32 {
    with_runner(-1, |r| {
        r.add_box(Vec2::new(x, y), Vec2::new(half_w, half_h), moving).0 as i32
    })
}

/// Returns the collider id, or -1 for a degenerate ramp.
#[wasm_bindgen]
pub fn level_add_ramp(x0: f32, y0: f32, x1: f32, y1: f32) -> i32 {
    with_runner(-1, |r| {
        r.add_ramp(Vec2::new(x0, y0), Vec2::new(x1, y1))
            .map_or(-1, |id| id.0 as i32)
    })
}

#[wasm_bindgen]
pub fn level_set_platform_velocity(id: u32, vx: f32, vy: f32) {
    with_runner((), |r| r.set_platform_velocity(ColliderId(id), Vec2::new(vx, vy)));
}

#[wasm_bindgen]
pub fn level_clear() {
    with_runner((), |r| r.level_mut().clear());
}

// ---- Input and commands ----

#[wasm_bindgen]
pub fn motor_input(move_x: f32, move_y: f32, jump_held: bool, fall_fast: bool) {
    with_runner((), |r| {
        r.set_input(MotorInput {
            move_x,
            move_y,
            fall_fast,
            jump_held,
        })
    });
}

#[wasm_bindgen]
pub fn motor_jump() {
    with_runner((), |r| r.motor_mut().jump());
}

#[wasm_bindgen]
pub fn motor_end_jump() {
    with_runner((), |r| r.motor_mut().end_jump());
}

#[wasm_bindgen]
pub fn motor_dash(dx: f32, dy: f32) {
    with_runner((), |r| r.motor_mut().dash_in(Vec2::new(dx, dy)));
}

#[wasm_bindgen]
pub fn motor_end_dash() {
    with_runner((), |r| r.motor_mut().end_dash());
}

#[wasm_bindgen]
pub fn motor_set_freedom(enabled: bool) {
    with_runner((), |r| r.motor_mut().set_freedom(enabled));
}

#[wasm_bindgen]
pub fn motor_teleport(x: f32, y: f32) {
    with_runner((), |r| r.motor_mut().teleport(Vec2::new(x, y)));
}

#[wasm_bindgen]
pub fn motor_set_active(active: bool) {
    with_runner((), |r| {
        if active {
            r.motor_mut().activate();
        } else {
            r.motor_mut().deactivate();
        }
    });
}

// ---- Data accessors ----

/// Position, velocity, state code, collision flags, facing and jump height
/// after the last fixed step.
#[wasm_bindgen]
pub fn motor_snapshot() -> js_sys::Float32Array {
    with_runner(js_sys::Float32Array::new_with_length(0), |r| {
        js_sys::Float32Array::from(r.snapshot_floats())
    })
}

#[wasm_bindgen]
pub fn motor_alpha() -> f32 {
    with_runner(0.0, |r| r.alpha())
}

#[wasm_bindgen]
pub fn get_motor_events_ptr() -> *const f32 {
    with_runner(std::ptr::null(), |r| r.events_ptr())
}

/// Number of events from the last frame, four floats each.
#[wasm_bindgen]
pub fn get_motor_events_len() -> u32 {
    with_runner(0, |r| r.events_len())
}
