//! The acquisition thread: one snapshot per cycle into the double buffer.
//!
//! ## Example
//!
//! ```ignore
//! use scenelens_core::{Acquisition, AcquisitionConfig, SnapshotBuffer, ShutdownSignal};
//!
//! let config = AcquisitionConfig::builder().target_fps(30).build();
//! let mut acquisition = Acquisition::new(reader, layout, process.base(), config);
//! let buffer = SnapshotBuffer::new();
//! let shutdown = ShutdownSignal::new();
//!
//! acquisition.run(&buffer, &shutdown);
//! ```

mod rate;
mod shutdown;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::buffer::SnapshotBuffer;
use crate::entity::ClassFilter;
use crate::layout::{LayoutTable, timing};
use crate::memory::{ReadMemory, RemoteAddress};
use crate::snapshot::{CycleOutcome, CycleStats, SnapshotBuilder};

pub use rate::{FrameGovernor, RateCommand, RateControl};
pub use shutdown::ShutdownSignal;

/// Settings for an [`Acquisition`].
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Cycles per second when limited
    pub target_fps: u32,
    /// Whether the cycle rate is capped at all
    pub rate_limited: bool,
    pub filter: ClassFilter,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            target_fps: timing::DEFAULT_TARGET_FPS,
            rate_limited: true,
            filter: ClassFilter::default(),
        }
    }
}

impl AcquisitionConfig {
    pub fn builder() -> AcquisitionConfigBuilder {
        AcquisitionConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AcquisitionConfigBuilder {
    target_fps: Option<u32>,
    rate_limited: Option<bool>,
    filter: Option<ClassFilter>,
}

impl AcquisitionConfigBuilder {
    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    pub fn rate_limited(mut self, enabled: bool) -> Self {
        self.rate_limited = Some(enabled);
        self
    }

    pub fn filter(mut self, filter: ClassFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> AcquisitionConfig {
        let default = AcquisitionConfig::default();
        AcquisitionConfig {
            target_fps: self.target_fps.unwrap_or(default.target_fps),
            rate_limited: self.rate_limited.unwrap_or(default.rate_limited),
            filter: self.filter.unwrap_or(default.filter),
        }
    }
}

/// Totals over one [`Acquisition::run`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub published: u64,
    /// Cycles not built because the consumer still held the back slot.
    pub skipped: u64,
    pub corrupt_counts: u64,
    /// The target stopped answering reads at its module base.
    pub target_lost: bool,
    pub last: Option<CycleStats>,
}

/// Owns the reader, the snapshot builder (and with it the name cache) and
/// the frame governor.
pub struct Acquisition<R> {
    reader: R,
    module_base: RemoteAddress,
    builder: SnapshotBuilder,
    governor: FrameGovernor,
}

impl<R: ReadMemory> Acquisition<R> {
    pub fn new(
        reader: R,
        layout: Arc<LayoutTable>,
        module_base: RemoteAddress,
        config: AcquisitionConfig,
    ) -> Self {
        let rate = Arc::new(RateControl::new(config.target_fps, config.rate_limited));
        debug!(
            "Acquisition for layout {} at {} ({} fps, limited: {})",
            layout.version,
            module_base,
            rate.target_rate(),
            rate.is_rate_limited()
        );
        Self {
            reader,
            module_base,
            builder: SnapshotBuilder::new(layout, module_base, config.filter),
            governor: FrameGovernor::new(rate),
        }
    }

    /// Handle for changing the rate while `run` is active.
    pub fn rate_control(&self) -> Arc<RateControl> {
        Arc::clone(self.governor.rate())
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn builder(&self) -> &SnapshotBuilder {
        &self.builder
    }

    /// Build and publish one snapshot.
    ///
    /// `None` when the back slot is still being read; nothing is read from
    /// the target in that case.
    pub fn step(&mut self, buffer: &SnapshotBuffer) -> Option<CycleStats> {
        let mut slot = buffer.begin_write()?;
        let stats = self.builder.build(&self.reader, &mut slot);
        slot.publish();
        Some(stats)
    }

    /// Cycle until shutdown or until the target disappears.
    pub fn run(&mut self, buffer: &SnapshotBuffer, shutdown: &ShutdownSignal) -> RunSummary {
        info!("Acquisition loop started");
        let mut summary = RunSummary::default();

        while !shutdown.is_shutdown() {
            self.governor.start_frame();

            let Some(stats) = self.step(buffer) else {
                summary.skipped += 1;
                if shutdown.wait(timing::BUSY_SLOT_BACKOFF) {
                    break;
                }
                continue;
            };

            summary.cycles += 1;
            summary.published += 1;
            summary.last = Some(stats);
            match stats.outcome {
                CycleOutcome::CorruptCount(_) => summary.corrupt_counts += 1,
                CycleOutcome::NoWorld if !self.target_alive() => {
                    info!("Target no longer readable, stopping");
                    summary.target_lost = true;
                    break;
                }
                _ => {}
            }
            debug!(
                "cycle {}: {:?} {} included, {} filtered, {} dropped",
                stats.cycle, stats.outcome, stats.included, stats.filtered, stats.dropped
            );

            if self.governor.end_frame(shutdown) {
                break;
            }
        }

        let names = self.builder.names().stats();
        info!(
            "Acquisition loop stopped after {} cycles ({} skipped, {} names cached)",
            summary.cycles, summary.skipped, names.resolved
        );
        summary
    }

    fn target_alive(&self) -> bool {
        self.reader.read_u64(self.module_base).is_ok()
    }
}
