// SPDX-License-Identifier: CEPL-1.0
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use crate::{FrameStatus, Renderer, Window};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub drawn: u64,
    pub skipped: u64,
    pub recreated: u64,
}

impl RunStats {
    pub fn ticks(&self) -> u64 {
        self.drawn + self.skipped + self.recreated
    }

    fn record(&mut self, status: FrameStatus) {
        match status {
            FrameStatus::Drawn => self.drawn += 1,
            FrameStatus::Skipped => self.skipped += 1,
            FrameStatus::Recreated => self.recreated += 1,
        }
    }
}

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Drives frames until the window asks to close (checked between frames) or
/// `max_frames` frames have been presented, then waits for the device to go
/// idle so teardown is safe.
pub fn run(
    renderer: &mut dyn Renderer,
    window: &mut dyn Window,
    max_frames: Option<u64>,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut window_start = Instant::now();
    let mut window_drawn = stats.drawn;

    while !window.should_close() {
        window.poll_events();
        let status = renderer.draw_frame(window)?;
        stats.record(status);
        if status != FrameStatus::Drawn {
            debug!(?status, "frame not presented");
        }

        let elapsed = window_start.elapsed();
        if elapsed >= FPS_WINDOW {
            let fps = (stats.drawn - window_drawn) as f64 / elapsed.as_secs_f64();
            info!(fps = format_args!("{fps:.1}"), "frame rate");
            window_start = Instant::now();
            window_drawn = stats.drawn;
        }

        if max_frames.is_some_and(|max| stats.drawn >= max) {
            info!(drawn = stats.drawn, "frame limit reached");
            break;
        }
    }

    renderer.wait_idle()?;
    info!(
        drawn = stats.drawn,
        skipped = stats.skipped,
        recreated = stats.recreated,
        "frame loop finished"
    );
    Ok(stats)
}
