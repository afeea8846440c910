use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use scenelens_core::{RateCommand, RateControl, ShutdownSignal};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Step applied by the `+` / `-` keys, in fps.
const RATE_STEP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Rate(RateCommand),
}

/// Spawn a thread that maps key presses onto the running pipeline.
///
/// - Esc, q, Q or Ctrl+C: shutdown
/// - `+` / `-`: raise or lower the acquisition rate
/// - `l`: toggle rate limiting
pub fn spawn_keyboard_monitor(
    shutdown: Arc<ShutdownSignal>,
    rate: Arc<RateControl>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_shutdown() {
            // Poll with a timeout so shutdown from elsewhere is noticed.
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let Ok(Event::Key(key_event)) = event::read() else {
                continue;
            };

            match key_action(&key_event, &rate) {
                Some(KeyAction::Quit) => {
                    debug!("Shutdown key pressed: {:?}", key_event.code);
                    shutdown.trigger();
                    break;
                }
                Some(KeyAction::Rate(command)) => info!("{}", rate.apply(command)),
                None => {}
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

fn key_action(event: &KeyEvent, rate: &RateControl) -> Option<KeyAction> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let action = match event.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('+') | KeyCode::Char('=') => {
            KeyAction::Rate(RateCommand::SetFps(rate.target_rate().saturating_add(RATE_STEP)))
        }
        KeyCode::Char('-') => {
            let lowered = rate.target_rate().saturating_sub(RATE_STEP).max(1);
            KeyAction::Rate(RateCommand::SetFps(lowered))
        }
        KeyCode::Char('l') | KeyCode::Char('L') if rate.is_rate_limited() => {
            KeyAction::Rate(RateCommand::DisableLimit)
        }
        KeyCode::Char('l') | KeyCode::Char('L') => KeyAction::Rate(RateCommand::EnableLimit),
        _ => return None,
    };
    Some(action)
}
