use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::*;

use crate::{cli, settings};

use super::backlight::Backlight;

pub struct Manager {
    backlight: Option<Backlight>,
    /// The remembered percent is canonical: restoring the screen recomputes
    /// the raw value from it instead of reading hardware back.
    brightness_percent: u8,
    screen_on: bool,
    touch_inhibit_path: Option<PathBuf>,
    screen_events: Sender<bool>,
}

impl Default for Manager {
    fn default() -> Self {
        let (screen_events, _receiver) = tokio::sync::broadcast::channel(16);
        Self {
            backlight: None,
            brightness_percent: 0,
            screen_on: true,
            touch_inhibit_path: None,
            screen_events,
        }
    }
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Manager>> = Default::default();
}

// Discover the backlight and restore the persisted brightness,
// should be done inside main after the settings manager
pub fn init() {
    let mut manager = MANAGER.lock().unwrap();

    manager.backlight = Backlight::discover(std::path::Path::new(
        cli::manager::backlight_root(),
    ));
    manager.brightness_percent = settings::manager::brightness_percent().min(100);
    manager.touch_inhibit_path = settings::manager::touch_inhibit_path().map(PathBuf::from);

    if let Some(backlight) = &manager.backlight {
        if let Err(error) = backlight.set_percent(manager.brightness_percent) {
            warn!("Failed restoring brightness: {error:#?}");
        }
    }
}

pub fn brightness_percent() -> u8 {
    MANAGER.lock().unwrap().brightness_percent
}

pub fn is_screen_on() -> bool {
    MANAGER.lock().unwrap().screen_on
}

pub fn subscribe_screen_events() -> Receiver<bool> {
    MANAGER.lock().unwrap().screen_events.subscribe()
}

/// Set and persist the brightness. The hardware write only happens while the
/// screen is on; a blanked screen keeps the new percent for its next wake.
pub fn set_brightness(percent: u8) -> Result<()> {
    let percent = percent.min(100);

    let result = {
        let mut manager = MANAGER.lock().unwrap();
        manager.brightness_percent = percent;

        match (&manager.backlight, manager.screen_on) {
            (Some(backlight), true) => backlight.set_percent(percent),
            (Some(_), false) => Ok(()),
            (None, _) => Ok(()),
        }
    };

    settings::manager::set_brightness_percent(percent);
    result
}

/// Blank or unblank the screen. Blanking suspends backlight power and
/// inhibits touch input without discarding the remembered brightness;
/// unblanking restores both.
pub fn set_screen(on: bool) -> Result<()> {
    let (result, changed) = {
        let mut manager = MANAGER.lock().unwrap();
        let changed = manager.screen_on != on;
        manager.screen_on = on;

        let result = apply_screen_state(&manager, on);
        if changed {
            let _ = manager.screen_events.send(on);
        }
        (result, changed)
    };

    if changed {
        info!("Screen turned {}", if on { "on" } else { "off" });
    }
    result
}

pub fn toggle_screen() -> Result<()> {
    let on = !is_screen_on();
    set_screen(on)
}

fn apply_screen_state(manager: &Manager, on: bool) -> Result<()> {
    if let Some(backlight) = &manager.backlight {
        backlight.set_power(on)?;
        if on {
            backlight.set_percent(manager.brightness_percent)?;
        }
    }

    if let Some(path) = &manager.touch_inhibit_path {
        let value = if on { "0" } else { "1" };
        std::fs::write(path, value)
            .context(format!("Failed writing touch inhibit to {path:?}"))?;
    }

    Ok(())
}
