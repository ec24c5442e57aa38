//! Physical-button press handling.
//!
//! The kernel delivers fixed-size `input_event` records over a character
//! device. Each record is:
//! ```text
//! struct input_event { timeval time; u16 type; u16 code; s32 value; }
//! ```
//! 24 bytes on 64-bit targets. Only `EV_KEY` records for the power key are
//! relevant; value 1 is a press edge, 0 a release edge, 2 a repeat (always
//! ignored).
//!
//! Press duration disambiguates two intents against a fixed 1.5 s deadline:
//! release before the deadline is a short press (screen toggle), the deadline
//! firing first is a long press (supervised-restart exit), after which the
//! eventual release is a no-op.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::*;

use crate::cli;

use super::{manager as controls_manager, power};

/// Hold duration separating short from long.
pub const LONG_PRESS_DEADLINE: Duration = Duration::from_millis(1500);

const EV_KEY: u16 = 0x01;
const KEY_POWER: u16 = 116;

/// Size of one kernel input record on 64-bit targets.
pub const INPUT_EVENT_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Down,
    Up,
    Repeat,
}

/// Decode one raw record, keeping only power-key edges.
pub fn parse_event(record: &[u8; INPUT_EVENT_SIZE]) -> Option<ButtonEdge> {
    let event_type = u16::from_ne_bytes([record[16], record[17]]);
    let code = u16::from_ne_bytes([record[18], record[19]]);
    let value = i32::from_ne_bytes([record[20], record[21], record[22], record[23]]);

    if event_type != EV_KEY || code != KEY_POWER {
        return None;
    }

    match value {
        0 => Some(ButtonEdge::Up),
        1 => Some(ButtonEdge::Down),
        2 => Some(ButtonEdge::Repeat),
        _ => None,
    }
}

/// What the surrounding loop must do after feeding the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    /// Arm the single-shot deadline timer.
    ArmDeadline,
    /// Cancel the deadline and act on a short press.
    ShortPress,
    /// Act on a long press; the deadline already consumed itself.
    LongPress,
    /// Nothing to do.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    Pressed,
    /// The long press already fired; waiting out the physical release.
    LongFired,
}

/// The press-duration state machine, pure so the timing policy is testable
/// without a clock. Exactly one of short/long is emitted per physical press.
#[derive(Debug)]
pub struct PressTracker {
    state: PressState,
}

impl Default for PressTracker {
    fn default() -> Self {
        Self {
            state: PressState::Idle,
        }
    }
}

impl PressTracker {
    pub fn on_edge(&mut self, edge: ButtonEdge) -> PressAction {
        match (self.state, edge) {
            (_, ButtonEdge::Repeat) => PressAction::None,
            (PressState::Idle, ButtonEdge::Down) => {
                self.state = PressState::Pressed;
                PressAction::ArmDeadline
            }
            (PressState::Pressed, ButtonEdge::Up) => {
                self.state = PressState::Idle;
                PressAction::ShortPress
            }
            // The release after a fired long press is a no-op
            (PressState::LongFired, ButtonEdge::Up) => {
                self.state = PressState::Idle;
                PressAction::None
            }
            _ => PressAction::None,
        }
    }

    /// The deadline fired. Stale wakeups while idle are ignored.
    pub fn on_deadline(&mut self) -> PressAction {
        match self.state {
            PressState::Pressed => {
                self.state = PressState::LongFired;
                PressAction::LongPress
            }
            _ => PressAction::None,
        }
    }
}

// Start the button listener, should be done inside main
pub fn start() {
    let device = cli::manager::button_device().to_string();
    tokio::spawn(async move {
        if let Err(error) = listen(&device).await {
            warn!("Button listener stopped: {error:#?}");
        }
    });
}

async fn listen(device: &str) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::open(device).await?;
    info!("Listening for button events on {device}");

    // Raw records are decoded on their own task; the state machine below
    // consumes edges from the queue so the deadline race stays clean.
    let (edge_sender, mut edges) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut record = [0u8; INPUT_EVENT_SIZE];
        loop {
            if let Err(error) = file.read_exact(&mut record).await {
                warn!("Button device read failed: {error:#?}");
                return;
            }
            if let Some(edge) = parse_event(&record) {
                if edge_sender.send(edge).is_err() {
                    return;
                }
            }
        }
    });

    let mut tracker = PressTracker::default();
    let mut deadline: Option<std::pin::Pin<Box<tokio::time::Sleep>>> = None;

    loop {
        tokio::select! {
            edge = edges.recv() => {
                let Some(edge) = edge else {
                    anyhow::bail!("Button event stream closed");
                };
                match tracker.on_edge(edge) {
                    PressAction::ArmDeadline => {
                        deadline = Some(Box::pin(tokio::time::sleep(LONG_PRESS_DEADLINE)));
                    }
                    PressAction::ShortPress => {
                        deadline = None;
                        debug!("Short press: toggling screen");
                        if let Err(error) = controls_manager::toggle_screen() {
                            warn!("Failed toggling screen: {error:#?}");
                        }
                    }
                    PressAction::LongPress | PressAction::None => {}
                }
            }
            _ = async { deadline.as_mut().unwrap().await }, if deadline.is_some() => {
                deadline = None;
                if tracker.on_deadline() == PressAction::LongPress {
                    info!("Long press: requesting supervised restart");
                    power::restart_for_supervisor();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event_type: u16, code: u16, value: i32) -> [u8; INPUT_EVENT_SIZE] {
        let mut buffer = [0u8; INPUT_EVENT_SIZE];
        buffer[16..18].copy_from_slice(&event_type.to_ne_bytes());
        buffer[18..20].copy_from_slice(&code.to_ne_bytes());
        buffer[20..24].copy_from_slice(&value.to_ne_bytes());
        buffer
    }

    #[test]
    fn decodes_power_key_edges() {
        assert_eq!(parse_event(&record(EV_KEY, KEY_POWER, 1)), Some(ButtonEdge::Down));
        assert_eq!(parse_event(&record(EV_KEY, KEY_POWER, 0)), Some(ButtonEdge::Up));
        assert_eq!(parse_event(&record(EV_KEY, KEY_POWER, 2)), Some(ButtonEdge::Repeat));
    }

    #[test]
    fn ignores_foreign_events() {
        // EV_SYN frame marker and an unrelated key
        assert_eq!(parse_event(&record(0x00, 0, 0)), None);
        assert_eq!(parse_event(&record(EV_KEY, 30, 1)), None);
    }

    #[test]
    fn quick_release_is_exactly_one_short_press() {
        let mut tracker = PressTracker::default();
        assert_eq!(tracker.on_edge(ButtonEdge::Down), PressAction::ArmDeadline);
        assert_eq!(tracker.on_edge(ButtonEdge::Up), PressAction::ShortPress);

        // The cancelled deadline firing late must not produce a long press
        assert_eq!(tracker.on_deadline(), PressAction::None);
    }

    #[test]
    fn held_past_deadline_is_exactly_one_long_press() {
        let mut tracker = PressTracker::default();
        assert_eq!(tracker.on_edge(ButtonEdge::Down), PressAction::ArmDeadline);
        assert_eq!(tracker.on_deadline(), PressAction::LongPress);

        // The trailing physical release is a no-op
        assert_eq!(tracker.on_edge(ButtonEdge::Up), PressAction::None);
    }

    #[test]
    fn repeats_are_ignored_in_every_state() {
        let mut tracker = PressTracker::default();
        assert_eq!(tracker.on_edge(ButtonEdge::Repeat), PressAction::None);

        tracker.on_edge(ButtonEdge::Down);
        assert_eq!(tracker.on_edge(ButtonEdge::Repeat), PressAction::None);

        tracker.on_deadline();
        assert_eq!(tracker.on_edge(ButtonEdge::Repeat), PressAction::None);
    }

    #[test]
    fn presses_loop_back_to_idle() {
        let mut tracker = PressTracker::default();

        tracker.on_edge(ButtonEdge::Down);
        tracker.on_edge(ButtonEdge::Up);
        assert_eq!(tracker.on_edge(ButtonEdge::Down), PressAction::ArmDeadline);
        assert_eq!(tracker.on_deadline(), PressAction::LongPress);
        tracker.on_edge(ButtonEdge::Up);
        assert_eq!(tracker.on_edge(ButtonEdge::Down), PressAction::ArmDeadline);
    }

    #[test]
    fn duplicate_down_does_not_rearm() {
        let mut tracker = PressTracker::default();
        tracker.on_edge(ButtonEdge::Down);
        assert_eq!(tracker.on_edge(ButtonEdge::Down), PressAction::None);
    }
}
