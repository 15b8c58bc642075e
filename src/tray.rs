// ABOUTME: Menubar status item using the tray-icon crate, with an icon drawn in memory
// ABOUTME: Menu selections are forwarded to the coordination thread as AppCommands

use crate::dispatch::AppCommand;
use anyhow::Result;
use std::sync::mpsc::Sender;
use std::thread;
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem},
};

const ICON_SIZE: u32 = 32;

pub struct LauncherTray {
    _tray_icon: TrayIcon,
}

// Menu item IDs - created at runtime
fn open_panel_id() -> MenuId {
    MenuId::new("open_panel")
}
fn quit_id() -> MenuId {
    MenuId::new("quit_keylaunch")
}

impl LauncherTray {
    pub fn new() -> Result<Self> {
        let menu = Menu::new();
        let open_item = MenuItem::with_id(open_panel_id(), "Open Search Panel", true, None);
        let separator = PredefinedMenuItem::separator();
        let quit_item = MenuItem::with_id(quit_id(), "Quit KeyLaunch", true, None);

        menu.append(&open_item)?;
        menu.append(&separator)?;
        menu.append(&quit_item)?;

        let icon = Icon::from_rgba(keycap_icon_rgba(ICON_SIZE), ICON_SIZE, ICON_SIZE)?;

        // Template mode lets macOS recolor the icon for dark menubars
        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("KeyLaunch")
            .with_icon(icon)
            .with_icon_as_template(true)
            .build()?;

        tracing::info!("Created menubar status item");

        Ok(Self {
            _tray_icon: tray_icon,
        })
    }

    /// Forwards menu selections to `sender` until the channel closes.
    pub fn forward_menu_events(sender: Sender<AppCommand>) {
        thread::spawn(move || {
            while let Ok(event) = MenuEvent::receiver().recv() {
                tracing::debug!(id = ?event.id, "Menu event");
                let Some(command) = command_for_menu(&event.id) else {
                    continue;
                };
                if sender.send(command).is_err() {
                    break;
                }
            }
        });
    }
}

fn command_for_menu(id: &MenuId) -> Option<AppCommand> {
    if *id == open_panel_id() {
        Some(AppCommand::TogglePanel)
    } else if *id == quit_id() {
        Some(AppCommand::Quit)
    } else {
        None
    }
}

/// A key-cap outline with a spacebar, as opaque black on transparent.
fn keycap_icon_rgba(size: u32) -> Vec<u8> {
    let mut rgba = vec![0u8; (size * size * 4) as usize];
    let inset = size / 8;
    let far = size - inset - 1;
    let border = 2;

    for y in 0..size {
        for x in 0..size {
            let inside = (inset..=far).contains(&x) && (inset..=far).contains(&y);
            if !inside {
                continue;
            }
            let on_border =
                x < inset + border || x > far - border || y < inset + border || y > far - border;
            let bar_top = size * 5 / 8;
            let on_bar =
                (bar_top..bar_top + border).contains(&y) && x > size / 4 && x < size * 3 / 4;
            // Rounded corners
            let corner = (x == inset || x == far) && (y == inset || y == far);

            if (on_border || on_bar) && !corner {
                let offset = ((y * size + x) * 4) as usize;
                rgba[offset + 3] = 0xff;
            }
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_buffer_shape() {
        let rgba = keycap_icon_rgba(ICON_SIZE);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
        let opaque = rgba.chunks(4).filter(|px| px[3] == 0xff).count();
        assert!(opaque > 0);
        // Outside the key cap stays transparent
        assert_eq!(rgba[3], 0);
    }

    #[test]
    fn test_menu_commands() {
        assert_eq!(command_for_menu(&open_panel_id()), Some(AppCommand::TogglePanel));
        assert_eq!(command_for_menu(&quit_id()), Some(AppCommand::Quit));
        assert_eq!(command_for_menu(&MenuId::new("other")), None);
    }
}
