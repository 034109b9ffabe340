//! Live monitor capture through the Windows Graphics Capture API

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use windows_capture::{
    capture::{Context, GraphicsCaptureApiHandler},
    frame::Frame,
    graphics_capture_api::InternalCaptureControl,
    monitor::Monitor,
    settings::{ColorFormat, CursorCaptureSettings, DrawBorderSettings, Settings},
};

use super::frame::CapturedFrame;
use super::{frame_interval, FrameCallback, FrameSource};

/// Captures one monitor
pub struct ScreenSource {
    monitor_index: usize,
    max_fps: u32,
}

impl ScreenSource {
    /// `monitor_index` 0 selects the primary monitor, N the Nth one
    pub fn new(monitor_index: usize, max_fps: u32) -> Self {
        Self {
            monitor_index,
            max_fps,
        }
    }

    fn monitor(&self) -> Result<Monitor> {
        let monitor = if self.monitor_index == 0 {
            Monitor::primary()
        } else {
            Monitor::from_index(self.monitor_index)
        };
        monitor.map_err(|e| anyhow!("Monitor {} unavailable: {}", self.monitor_index, e))
    }
}

/// State handed to the capture thread
#[derive(Clone)]
struct HandlerFlags {
    on_frame: Arc<Mutex<FrameCallback>>,
    interval: Option<Duration>,
}

struct Handler {
    on_frame: Arc<Mutex<FrameCallback>>,
    interval: Option<Duration>,
    last_delivery: Option<Instant>,
}

impl GraphicsCaptureApiHandler for Handler {
    type Flags = HandlerFlags;
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn new(ctx: Context<Self::Flags>) -> Result<Self, Self::Error> {
        Ok(Self {
            on_frame: ctx.flags.on_frame,
            interval: ctx.flags.interval,
            last_delivery: None,
        })
    }

    fn on_frame_arrived(
        &mut self,
        frame: &mut Frame,
        capture_control: InternalCaptureControl,
    ) -> Result<(), Self::Error> {
        if let (Some(interval), Some(last)) = (self.interval, self.last_delivery) {
            if last.elapsed() < interval {
                return Ok(());
            }
        }
        self.last_delivery = Some(Instant::now());

        let mut buffer = frame.buffer()?;
        let (width, height) = (buffer.width(), buffer.height());
        let data = buffer.as_nopadding_buffer()?.to_vec();
        let captured = CapturedFrame::new(data, width, height);

        if (self.on_frame.lock())(&captured).is_break() {
            capture_control.stop();
        }
        Ok(())
    }

    fn on_closed(&mut self) -> Result<(), Self::Error> {
        warn!("Capture item closed");
        Ok(())
    }
}

impl FrameSource for ScreenSource {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn run(self: Box<Self>, on_frame: FrameCallback) -> Result<()> {
        let monitor = self.monitor()?;
        info!(
            "Capturing monitor {} at up to {} fps",
            self.monitor_index, self.max_fps
        );

        let flags = HandlerFlags {
            on_frame: Arc::new(Mutex::new(on_frame)),
            interval: frame_interval(self.max_fps),
        };
        let settings = Settings::new(
            monitor,
            CursorCaptureSettings::WithoutCursor,
            DrawBorderSettings::WithoutBorder,
            ColorFormat::Rgba8,
            flags,
        );

        Handler::start(settings).map_err(|e| anyhow!("Screen capture failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_monitor_is_an_error() {
        let source = ScreenSource::new(64, 10);
        assert!(source.monitor().is_err());
    }
}
