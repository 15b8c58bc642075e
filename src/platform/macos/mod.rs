// ABOUTME: macOS key interception for hotkey recording via an NSEvent local monitor
// ABOUTME: Also sets the accessory activation policy and pumps the main run loop between commands

use super::{KeyEventTap, KeySink};
use crate::hotkey::Modifiers;
use crate::recording::{KeyEvent, RecordingSession};
use anyhow::{Result, anyhow};
use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_app_kit::{
    NSApplication, NSApplicationActivationPolicy, NSEvent, NSEventMask, NSEventModifierFlags,
};
use objc2_core_foundation::{CFRunLoop, kCFRunLoopDefaultMode};
use objc2_foundation::{MainThreadMarker, NSDefaultRunLoopMode};
use std::ptr::NonNull;

/// Swallows the key-downs the recorder consumes while recording is active.
pub struct LocalKeyTap {
    monitor: Option<Retained<AnyObject>>,
}

impl LocalKeyTap {
    pub fn new() -> Self {
        Self { monitor: None }
    }
}

impl Default for LocalKeyTap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventTap for LocalKeyTap {
    fn start(&mut self, sink: KeySink) -> Result<()> {
        self.stop();

        let handler = RcBlock::new(move |event: NonNull<NSEvent>| -> *mut NSEvent {
            let (key_code, flags) = unsafe {
                let ns_event = event.as_ref();
                (ns_event.keyCode(), ns_event.modifierFlags())
            };
            let key_event = KeyEvent::new(u32::from(key_code), modifiers_from_flags(flags));
            let suppress = RecordingSession::should_suppress(&key_event);
            sink(key_event);

            if suppress {
                std::ptr::null_mut()
            } else {
                event.as_ptr()
            }
        });

        let monitor = unsafe {
            NSEvent::addLocalMonitorForEventsMatchingMask_handler(NSEventMask::KeyDown, &handler)
        };
        match monitor {
            Some(monitor) => {
                self.monitor = Some(monitor);
                tracing::debug!("Installed local key monitor for recording");
                Ok(())
            }
            None => Err(anyhow!("Failed to install local key monitor")),
        }
    }

    fn stop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            unsafe {
                NSEvent::removeMonitor(&monitor);
            }
            tracing::debug!("Removed local key monitor");
        }
    }
}

impl Drop for LocalKeyTap {
    fn drop(&mut self) {
        self.stop();
    }
}

fn modifiers_from_flags(flags: NSEventModifierFlags) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    if flags.contains(NSEventModifierFlags::Command) {
        modifiers |= Modifiers::COMMAND;
    }
    if flags.contains(NSEventModifierFlags::Option) {
        modifiers |= Modifiers::OPTION;
    }
    if flags.contains(NSEventModifierFlags::Control) {
        modifiers |= Modifiers::CONTROL;
    }
    if flags.contains(NSEventModifierFlags::Shift) {
        modifiers |= Modifiers::SHIFT;
    }
    modifiers
}

/// Creates the shared NSApplication as a menubar-only (no Dock icon) app.
pub fn init_application() {
    let Some(mtm) = MainThreadMarker::new() else {
        tracing::warn!("Not on the main thread, skipping NSApplication setup");
        return;
    };
    let app = NSApplication::sharedApplication(mtm);
    if !app.setActivationPolicy(NSApplicationActivationPolicy::Accessory) {
        tracing::warn!("Failed to set accessory activation policy");
    }
}

/// Delivers every queued AppKit event, then services pending run loop sources.
/// Local key monitors and status item menus only see events that pass
/// through `sendEvent`.
pub fn pump_run_loop() {
    if let Some(mtm) = MainThreadMarker::new() {
        let delivered = drain_app_events(mtm);
        if delivered > 0 {
            tracing::trace!(delivered, "Dispatched AppKit events");
        }
    }
    unsafe {
        CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, 0.0, true);
    }
}

/// Dequeues without waiting until the queue is empty. Returns how many events
/// were sent.
#[allow(unused_unsafe)]
fn drain_app_events(mtm: MainThreadMarker) -> usize {
    let app = NSApplication::sharedApplication(mtm);
    let mut delivered = 0;
    loop {
        // A nil date means do not block
        let event = unsafe {
            app.nextEventMatchingMask_untilDate_inMode_dequeue(
                NSEventMask::Any,
                None,
                NSDefaultRunLoopMode,
                true,
            )
        };
        let Some(event) = event else {
            break;
        };
        unsafe { app.sendEvent(&event) };
        delivered += 1;
    }
    delivered
}
