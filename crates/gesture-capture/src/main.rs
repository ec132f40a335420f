//! gesture-watch: diagnostic tool that prints classified gestures.
//!
//! Installs the system-wide hooks via [`InputEvents::global`] and logs
//! every semantic gesture until Enter is pressed.  If the hooks cannot
//! be installed the tool exits loudly — a missing global hook must be
//! visible immediately, not discovered later as "events never fire".

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, trace};
use tracing_subscriber::EnvFilter;

use gesture_capture::config;
use gesture_capture::facade::{FacadeOptions, InputEvents};

fn main() -> anyhow::Result<()> {
    // Load config first so its log level can seed the filter; RUST_LOG
    // still overrides.
    let cfg = config::load_config().unwrap_or_else(|e| {
        eprintln!("config unreadable ({e}); using defaults");
        config::CaptureConfig::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.log.level.clone())),
        )
        .init();

    info!("gesture-watch starting");

    let options = FacadeOptions {
        suppression: cfg.suppression_config(),
        thresholds: cfg.drag_thresholds(),
        ..FacadeOptions::default()
    };

    let events = match InputEvents::global_with(options) {
        Ok(events) => Arc::new(events),
        Err(e) => {
            error!("global hooks unavailable: {e}");
            anyhow::bail!("cannot run without global input hooks: {e}");
        }
    };

    // Subscribing installs the hooks; a failure here is fatal.  The raw
    // pre-filter observers log at trace and moves at debug, so the
    // default "info" level stays readable under a move storm.
    let mut subscriptions = Vec::new();
    subscriptions.push(
        events
            .on_raw_keyboard(|r| trace!(vk = r.vk_code, is_up = r.is_up, "raw keyboard record"))
            .context("keyboard hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_key_down(|e| info!(vk = e.vk_code, mods = ?e.modifiers, "key down"))
            .context("keyboard hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_key_press(|e| info!(ch = ?e.character, "key press"))
            .context("keyboard hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_key_up(|e| info!(vk = e.vk_code, "key up"))
            .context("keyboard hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_raw_mouse(|r| trace!(pos = ?r.position, is_up = r.is_up, "raw mouse record"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_move(|e| debug!(pos = ?e.position, buttons = ?e.buttons, "mouse move"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_down(|e| info!(button = ?e.button, pos = ?e.position, "mouse down"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_up(|e| info!(button = ?e.button, "mouse up"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_click(|e| info!(button = ?e.button, "click"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_double_click(|e| info!(button = ?e.button, "double click"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_mouse_wheel(|e| info!(delta = e.wheel_delta, "wheel"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_drag_start(|e| info!(pos = ?e.position, "drag start"))
            .context("mouse hook installation failed")?,
    );
    subscriptions.push(
        events
            .on_drag_finish(|e| info!(pos = ?e.position, "drag finish"))
            .context("mouse hook installation failed")?,
    );

    info!("hooks installed; press Enter to exit");
    let stdin = std::io::stdin();
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("stdin read failed")?;

    for subscription in subscriptions {
        events.unsubscribe(subscription);
    }
    events.dispose();
    info!("gesture-watch stopped");
    Ok(())
}
