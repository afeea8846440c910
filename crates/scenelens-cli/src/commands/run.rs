//! Live mode: acquisition thread, presenter thread, keyboard monitor.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Result, anyhow};
use scenelens_core::{
    Acquisition, AcquisitionConfig, ClassFilter, MemoryReader, ShutdownSignal, SnapshotBuffer,
};
use tracing::{info, warn};

use super::target::TargetArgs;
use crate::{input, presenter};

pub struct RunOptions {
    pub target: TargetArgs,
    pub fps: u32,
    pub rate_limited: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub screen: (f32, f32),
}

impl RunOptions {
    fn filter(&self) -> ClassFilter {
        let filter = self
            .include
            .iter()
            .fold(ClassFilter::new(), |f, p| f.include(p.as_str()));
        self.exclude.iter().fold(filter, |f, p| f.exclude(p.as_str()))
    }
}

/// Run until Ctrl+C, a quit key, or the target going away.
pub fn run(options: RunOptions) -> Result<()> {
    let target = options.target.attach()?;

    // Setup graceful shutdown handler
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let config = AcquisitionConfig::builder()
        .target_fps(options.fps)
        .rate_limited(options.rate_limited)
        .filter(options.filter())
        .build();

    let base = target.process.base();
    let mut acquisition = Acquisition::new(
        MemoryReader::new(target.process.clone()),
        Arc::clone(&target.layout),
        base,
        config,
    );
    let rate = acquisition.rate_control();
    let buffer = Arc::new(SnapshotBuffer::new());

    let acquisition_handle = {
        let buffer = Arc::clone(&buffer);
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || {
                let summary = acquisition.run(&buffer, &shutdown);
                // Stop the consumers too if the target went away.
                shutdown.trigger();
                summary
            })?
    };
    let presenter_handle = presenter::spawn(Arc::clone(&buffer), Arc::clone(&shutdown), options.screen);
    let keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown), rate);

    println!("Running... (Esc or q to quit, +/- to change rate, l to toggle the limit)");

    let summary = acquisition_handle
        .join()
        .map_err(|_| anyhow!("acquisition thread panicked"))?;
    let frames = presenter_handle
        .join()
        .map_err(|_| anyhow!("presenter thread panicked"))?;
    join_helper(keyboard_handle, "keyboard monitor");

    if summary.target_lost {
        warn!("Target {} is no longer readable", target.process.pid);
    }
    info!(
        "Stopped: {} cycles published, {} skipped, {} corrupt counts, {} frames presented",
        summary.published, summary.skipped, summary.corrupt_counts, frames
    );
    Ok(())
}

/// Join a thread whose panic should not fail the run. `false` if it panicked.
fn join_helper(handle: JoinHandle<()>, name: &str) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("{} thread panicked", name);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_helper_reports_panic() {
        let ok = thread::spawn(|| {});
        assert!(join_helper(ok, "quiet"));

        let failing = thread::spawn(|| panic!("keyboard gone"));
        assert!(!join_helper(failing, "failing"));
    }

    #[test]
    fn test_filter_from_options() {
        let options = RunOptions {
            target: TargetArgs {
                pid: 1,
                base: 0x1000,
                layout: "layout.toml".into(),
                overrides: Vec::new(),
            },
            fps: 60,
            rate_limited: true,
            include: vec!["Pawn".to_string()],
            exclude: vec!["Bot".to_string()],
            screen: (1920.0, 1080.0),
        };
        let filter = options.filter();
        assert!(filter.admits("PlayerPawn"));
        assert!(!filter.admits("BotPawn"));
        assert!(!filter.admits("Prop"));
    }
}
