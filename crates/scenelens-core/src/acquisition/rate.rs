use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::info;

use crate::layout::timing;

use super::ShutdownSignal;

/// Rate settings shared between the acquisition loop and whoever controls it.
#[derive(Debug)]
pub struct RateControl {
    target_fps: AtomicU32,
    limited: AtomicBool,
}

impl Default for RateControl {
    fn default() -> Self {
        Self::new(timing::DEFAULT_TARGET_FPS, true)
    }
}

impl RateControl {
    pub fn new(target_fps: u32, limited: bool) -> Self {
        let control = Self {
            target_fps: AtomicU32::new(timing::DEFAULT_TARGET_FPS),
            limited: AtomicBool::new(limited),
        };
        control.set_target_rate(target_fps);
        control
    }

    /// Set the cap in cycles per second. Zero is ignored; values above
    /// `MAX_TARGET_FPS` are clamped. Returns the rate now in effect.
    pub fn set_target_rate(&self, fps: u32) -> u32 {
        if fps > 0 {
            self.target_fps
                .store(fps.min(timing::MAX_TARGET_FPS), Ordering::Relaxed);
        }
        self.target_rate()
    }

    pub fn target_rate(&self) -> u32 {
        self.target_fps.load(Ordering::Relaxed)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.limited.load(Ordering::Relaxed)
    }

    pub fn set_rate_limiting(&self, enabled: bool) {
        self.limited.store(enabled, Ordering::Relaxed);
    }

    /// Minimum cycle duration, or `None` when unlimited.
    pub fn frame_budget(&self) -> Option<Duration> {
        if !self.is_rate_limited() {
            return None;
        }
        Some(Duration::from_secs(1) / self.target_rate().max(1))
    }

    /// Apply a control command and return its reply line.
    pub fn apply(&self, command: RateCommand) -> String {
        match command {
            RateCommand::SetFps(fps) => {
                let fps = self.set_target_rate(fps);
                info!("Target rate set to {} fps", fps);
                format!("FPS limit set to: {}", fps)
            }
            RateCommand::InvalidFps => "Error: Invalid FPS value".to_string(),
            RateCommand::EnableLimit => {
                self.set_rate_limiting(true);
                info!("Rate limiting enabled ({} fps)", self.target_rate());
                format!("FPS limiting enabled with target: {}", self.target_rate())
            }
            RateCommand::DisableLimit => {
                self.set_rate_limiting(false);
                info!("Rate limiting disabled");
                "FPS limiting disabled".to_string()
            }
        }
    }
}

/// A line of the rate-control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCommand {
    SetFps(u32),
    /// `SET_FPS:` with a missing, non-numeric or zero value.
    InvalidFps,
    EnableLimit,
    DisableLimit,
}

impl RateCommand {
    /// Parse one command line. `None` if it is not a rate command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(value) = line.strip_prefix("SET_FPS:") {
            let valid = !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
            return Some(match value.parse::<u32>() {
                Ok(fps) if valid && fps > 0 => RateCommand::SetFps(fps),
                _ => RateCommand::InvalidFps,
            });
        }
        match line {
            "ENABLE_FPS_LIMIT" => Some(RateCommand::EnableLimit),
            "DISABLE_FPS_LIMIT" => Some(RateCommand::DisableLimit),
            _ => None,
        }
    }
}

/// Paces the acquisition loop to the configured rate.
#[derive(Debug)]
pub struct FrameGovernor {
    rate: Arc<RateControl>,
    frame_start: Instant,
}

impl FrameGovernor {
    pub fn new(rate: Arc<RateControl>) -> Self {
        Self {
            rate,
            frame_start: Instant::now(),
        }
    }

    pub fn rate(&self) -> &Arc<RateControl> {
        &self.rate
    }

    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Time still owed to this frame.
    pub fn remaining(&self) -> Duration {
        match self.rate.frame_budget() {
            Some(budget) => budget.saturating_sub(self.frame_start.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep out the rest of the frame. Returns `true` on shutdown.
    pub fn end_frame(&self, shutdown: &ShutdownSignal) -> bool {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return shutdown.is_shutdown();
        }
        shutdown.wait(remaining)
    }
}
