// ABOUTME: Platform abstraction for the OS global-hotkey table and in-process key interception
// ABOUTME: Keeps the registry and recorder testable behind the HotKeyFacility and KeyEventTap traits

use crate::hotkey::HotKeyBinding;
use crate::recording::KeyEvent;
use thiserror::Error;

pub mod global;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(test)]
pub mod testing;

/// Registry-assigned id carried by every hotkey-fired event.
pub type HotKeyToken = u32;

/// Where OS threads deliver fired hotkeys and intercepted key-downs.
pub type TokenSink = Box<dyn Fn(HotKeyToken) + Send + Sync>;
pub type KeySink = Box<dyn Fn(KeyEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("the combination is already claimed by another application")]
    AlreadyClaimed,
    #[error("the system rejected the combination: {0}")]
    Rejected(String),
    #[error("the key cannot be used as a global hotkey on this platform")]
    Unsupported,
    #[error("global hotkeys are not available")]
    NotInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to install the global hotkey event handler: {0}")]
pub struct InstallError(pub String);

/// The process-wide global hotkey table.
pub trait HotKeyFacility {
    /// Installs the event subscription. Called once, before any register.
    fn install(&mut self, sink: TokenSink) -> Result<(), InstallError>;

    fn register(&mut self, binding: HotKeyBinding, token: HotKeyToken) -> Result<(), RegisterError>;

    /// Unregistering an unknown token is a no-op.
    fn unregister(&mut self, token: HotKeyToken);
}

/// Temporary in-process interception of key-down events while recording.
pub trait KeyEventTap {
    fn start(&mut self, sink: KeySink) -> anyhow::Result<()>;

    fn stop(&mut self);
}

/// Used where the host UI feeds recording keys itself.
#[derive(Default)]
pub struct NoopKeyTap;

impl KeyEventTap for NoopKeyTap {
    fn start(&mut self, _sink: KeySink) -> anyhow::Result<()> {
        tracing::debug!("No key interception on this platform");
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Platform factory to get the appropriate implementations
pub struct Platform;

impl Platform {
    pub fn hotkey_facility() -> Box<dyn HotKeyFacility> {
        Box::new(global::GlobalHotKeyFacility::new())
    }

    #[cfg(target_os = "macos")]
    pub fn key_tap() -> Box<dyn KeyEventTap> {
        Box::new(macos::LocalKeyTap::new())
    }

    #[cfg(not(target_os = "macos"))]
    pub fn key_tap() -> Box<dyn KeyEventTap> {
        Box::new(NoopKeyTap)
    }
}

/// Lets the platform deliver queued OS events to the current thread.
#[cfg(target_os = "macos")]
pub fn pump_events() {
    macos::pump_run_loop();
}

#[cfg(not(target_os = "macos"))]
pub fn pump_events() {}
