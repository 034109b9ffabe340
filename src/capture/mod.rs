//! Screen Capture Layer
//!
//! Frame sources feeding the pipeline. On Windows the live source uses the
//! Windows Graphics Capture API, a read-only operation that captures pixels
//! without any game interaction. The replay source works everywhere.

pub mod frame;
pub mod replay;
#[cfg(windows)]
pub mod screen;

use anyhow::{Context, Result};
use std::ops::ControlFlow;

use crate::config::{CaptureSettings, CaptureSourceKind};
use frame::CapturedFrame;
pub use replay::ReplaySource;

/// Called for every delivered frame; `Break` stops the source
pub type FrameCallback = Box<dyn FnMut(&CapturedFrame) -> ControlFlow<()> + Send>;

/// Something that produces frames
pub trait FrameSource {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Deliver frames until the source is exhausted, the callback breaks,
    /// or capture fails. Blocks the calling thread.
    fn run(self: Box<Self>, on_frame: FrameCallback) -> Result<()>;
}

/// Build the source selected in the capture settings
pub fn create_source(settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    match settings.source {
        CaptureSourceKind::Replay => {
            let dir = settings
                .replay_dir
                .as_ref()
                .context("Replay source selected but capture.replay_dir is not set")?;
            Ok(Box::new(ReplaySource::from_dir(
                dir,
                settings.max_fps,
                settings.loop_replay,
            )?))
        }
        CaptureSourceKind::Screen => create_screen_source(settings),
    }
}

#[cfg(windows)]
fn create_screen_source(settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(screen::ScreenSource::new(
        settings.monitor_index,
        settings.max_fps,
    )))
}

#[cfg(not(windows))]
fn create_screen_source(_settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("Screen capture is only available on Windows; use the replay source")
}

/// Minimum spacing between delivered frames, `None` when unthrottled
pub(crate) fn frame_interval(max_fps: u32) -> Option<std::time::Duration> {
    (max_fps > 0).then(|| std::time::Duration::from_secs_f64(1.0 / max_fps as f64))
}
