// ABOUTME: Global hotkey binding subsystem for the KeyLaunch launcher
// ABOUTME: Exposes binding model, conflict checks, storage, registry, recorder and the Launcher facade

pub mod app;
pub mod config;
pub mod conflict;
pub mod dispatch;
pub mod events;
pub mod hotkey;
pub mod logging;
pub mod model;
pub mod platform;
pub mod recording;
pub mod registry;
pub mod store;
#[cfg(target_os = "macos")]
pub mod tray;
