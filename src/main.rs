// ABOUTME: Composition root: loads settings, builds the launcher and runs the coordination loop
// ABOUTME: Hosts the default toggle/open/extension handlers and the macOS status item

use anyhow::Result;
use keylaunch::app::Launcher;
use keylaunch::config::Config;
use keylaunch::hotkey::HotKeyBinding;
use keylaunch::logging;
use keylaunch::platform::Platform;
use keylaunch::store::BindingStore;
use std::path::Path;
use std::process::Command;

#[cfg(target_os = "macos")]
const OPEN_COMMAND: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPEN_COMMAND: &str = "xdg-open";

fn main() -> Result<()> {
    let config = Config::load_or_default();
    logging::init(&config.logging.level);
    tracing::info!("Starting KeyLaunch");

    #[cfg(target_os = "macos")]
    keylaunch::platform::macos::init_application();

    let default_toggle = config
        .toggle_binding()
        .unwrap_or_else(|_| HotKeyBinding::default_toggle());
    let bindings_path = match config.bindings_path() {
        Some(path) => path,
        None => BindingStore::default_path()?,
    };
    let store = BindingStore::new(bindings_path, default_toggle);

    let facility = config.hotkeys.enabled.then(Platform::hotkey_facility);
    let mut launcher = Launcher::new(store, facility, Platform::key_tap());
    launcher.load_bindings();

    launcher.set_on_toggle(|| tracing::info!("Search panel toggled"));
    launcher.set_on_open(|item| {
        if let Err(e) = open_path(&item.path) {
            tracing::error!(item = %item.id, "Failed to open {}: {e:#}", item.name);
        }
    });
    launcher.set_on_enter_extension(|item| {
        tracing::info!(item = %item.id, "Entering extension for {}", item.name);
    });

    let sender = launcher.command_sender();
    let events = launcher.subscribe();
    std::thread::spawn(move || {
        for event in events {
            tracing::debug!(?event, "Binding event");
        }
    });

    #[cfg(target_os = "macos")]
    let _tray = match keylaunch::tray::LauncherTray::new() {
        Ok(tray) => {
            keylaunch::tray::LauncherTray::forward_menu_events(sender.clone());
            Some(tray)
        }
        Err(e) => {
            tracing::warn!("Failed to create status item: {e:#}");
            None
        }
    };
    drop(sender);

    tracing::info!(
        toggle = %launcher.bindings().toggle.display_symbols(),
        hotkeys = launcher.registry().active_count(),
        "KeyLaunch is running"
    );

    launcher.run_command_loop()
}

fn open_path(path: &Path) -> Result<()> {
    Command::new(OPEN_COMMAND).arg(path).spawn()?;
    Ok(())
}
