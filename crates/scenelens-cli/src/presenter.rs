//! Text stand-in for a rendering consumer.
//!
//! Reads the latest snapshot at display rate, projects every record and
//! logs a summary once per interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use scenelens_core::layout::timing;
use scenelens_core::{CameraPose, EntitySnapshot, ShutdownSignal, SnapshotBuffer, project};
use tracing::{debug, info};

/// Consumer-side frame interval.
const FRAME: Duration = Duration::from_millis(16);

/// Off-screen slack for projected points, in pixels.
const SCREEN_MARGIN: f32 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameSummary {
    pub cycle: u64,
    pub camera: CameraPose,
    pub entities: usize,
    pub visible: usize,
    pub on_screen: usize,
}

/// Project every record of `snapshot` onto a `width` x `height` screen.
pub fn summarize(snapshot: &EntitySnapshot, width: f32, height: f32) -> FrameSummary {
    let mut summary = FrameSummary {
        cycle: snapshot.cycle,
        camera: snapshot.camera,
        entities: snapshot.len(),
        ..Default::default()
    };
    for record in &snapshot.records {
        let projection = project(record.position, &snapshot.camera, width, height);
        if projection.is_visible() {
            summary.visible += 1;
            if projection.on_screen(width, height, SCREEN_MARGIN) {
                summary.on_screen += 1;
            }
        }
    }
    summary
}

pub fn spawn(
    buffer: Arc<SnapshotBuffer>,
    shutdown: Arc<ShutdownSignal>,
    screen: (f32, f32),
) -> JoinHandle<u64> {
    thread::spawn(move || {
        debug!("Presenter started ({}x{})", screen.0, screen.1);
        let mut frames = 0u64;
        let mut last_log = Instant::now();
        let mut last_cycle = 0;

        while !shutdown.is_shutdown() {
            let summary = {
                let snapshot = buffer.read();
                summarize(&snapshot, screen.0, screen.1)
            };
            frames += 1;

            if last_log.elapsed() >= timing::PRESENT_LOG_INTERVAL {
                let camera = summary.camera;
                info!(
                    "cycle {} (+{}): {} entities, {} in front, {} on screen | camera {:.0},{:.0},{:.0} yaw {:.1} fov {:.0}",
                    summary.cycle,
                    summary.cycle.saturating_sub(last_cycle),
                    summary.entities,
                    summary.visible,
                    summary.on_screen,
                    camera.location.x,
                    camera.location.y,
                    camera.location.z,
                    camera.rotation.yaw,
                    camera.fov
                );
                last_cycle = summary.cycle;
                last_log = Instant::now();
            }

            if shutdown.wait(FRAME) {
                break;
            }
        }

        debug!("Presenter stopped after {} frames", frames);
        frames
    })
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_screen(s: &str) -> Result<(f32, f32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err("screen size must be non-zero".to_string());
    }
    Ok((w as f32, h as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenelens_core::{CameraPose, EntityRecord, Rotator, Vec3};

    #[test]
    fn test_parse_screen() {
        assert_eq!(parse_screen("1920x1080").unwrap(), (1920.0, 1080.0));
        assert_eq!(parse_screen("800X600").unwrap(), (800.0, 600.0));
        assert!(parse_screen("1920").is_err());
        assert!(parse_screen("0x100").is_err());
        assert!(parse_screen("axb").is_err());
    }

    #[test]
    fn test_summarize_counts_visibility() {
        let mut snapshot = EntitySnapshot::new();
        snapshot.cycle = 4;
        snapshot.camera = CameraPose::new(Vec3::ZERO, Rotator::default(), 90.0);
        for position in [
            Vec3::new(1000.0, 0.0, 0.0),
            Vec3::new(1000.0, 5000.0, 0.0),
            Vec3::new(-1000.0, 0.0, 0.0),
        ] {
            snapshot.records.push(EntityRecord {
                position,
                ..Default::default()
            });
        }

        let summary = summarize(&snapshot, 1920.0, 1080.0);
        assert_eq!(
            summary,
            FrameSummary {
                cycle: 4,
                camera: snapshot.camera,
                entities: 3,
                visible: 2,
                on_screen: 1,
            }
        );
    }
}
