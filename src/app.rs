//! Application Coordinator
//!
//! Builds the pipeline and its collaborators at startup, wires the capture
//! trigger to a frame source and prints priced items as they arrive.
//! Startup failures (recognition backend, catalog download, hotkey
//! registration) are fatal and returned to `main`.

use anyhow::{ensure, Context, Result};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::{KeywordFilter, TextResolver};
use crate::capture::frame::CapturedFrame;
use crate::capture::{self, FrameSource, ReplaySource};
use crate::config::AppConfig;
use crate::hotkey::{capture_trigger, HotkeyListener, TriggerReceiver};
use crate::market::{MarketClient, PricedItem};
use crate::pipeline::{FramePipeline, FrameReport};
use crate::storage::CutWriter;
use crate::vision::create_recognizer;

/// Run-time choices made on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replay screenshots from this directory instead of the configured source
    pub replay: Option<PathBuf>,
    /// Process one screenshot and exit
    pub image: Option<PathBuf>,
    /// Process every delivered frame instead of waiting for the hotkey
    pub every_frame: bool,
}

/// Main application coordinator
pub struct PriceLensApp {
    config: AppConfig,
    options: RunOptions,
}

impl PriceLensApp {
    pub fn new(config: AppConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    /// Initialize every collaborator, failing fast on the first one that cannot start
    fn build_pipeline(&self) -> Result<FramePipeline> {
        let recognizer =
            create_recognizer(&self.config.ocr).context("Failed to initialize text recognition")?;
        let filter = KeywordFilter::new(&self.config.filter.include, &self.config.filter.exclude);
        let resolver = TextResolver::new(recognizer, filter);
        info!("Text recognition backend: {}", resolver.backend());

        let client =
            MarketClient::new(&self.config.market).context("Failed to create market client")?;
        let catalog = client
            .fetch_catalog()
            .context("Failed to download the item catalog")?;
        ensure!(!catalog.is_empty(), "The item catalog is empty");

        let pipeline = FramePipeline::new(
            &self.config.vision,
            resolver,
            catalog,
            Box::new(client),
            Duration::from_millis(self.config.market.rate_limit_ms),
        );

        if !self.config.debug.save_cuts {
            return Ok(pipeline);
        }
        let writer = match &self.config.debug.cuts_dir {
            Some(dir) => CutWriter::new(dir.clone())?,
            None => CutWriter::in_data_dir()?,
        };
        info!("Saving cuts to {:?}", writer.dir());
        Ok(pipeline.with_cut_writer(writer))
    }

    fn frame_source(&self) -> Result<Box<dyn FrameSource>> {
        if let Some(image) = &self.options.image {
            return Ok(Box::new(ReplaySource::single(image.clone())));
        }
        if let Some(dir) = &self.options.replay {
            return Ok(Box::new(ReplaySource::from_dir(
                dir,
                self.config.capture.max_fps,
                self.config.capture.loop_replay,
            )?));
        }
        capture::create_source(&self.config.capture)
    }

    /// Run until the frame source ends
    pub fn run(self) -> Result<()> {
        let mut pipeline = self.build_pipeline()?;
        let source = self.frame_source()?;

        // Single-image runs always process their one frame
        let single_shot = self.options.image.is_some();
        let (trigger, _listener) = if single_shot || self.options.every_frame {
            (TriggerReceiver::every_frame(), None)
        } else {
            let (sender, receiver) = capture_trigger();
            let listener = HotkeyListener::spawn(&self.config.hotkey.trigger, sender)?;
            info!("Press {} to price the items on screen", self.config.hotkey.trigger);
            (receiver, Some(listener))
        };

        info!("Starting {} source", source.name());
        source.run(Box::new(move |frame: &CapturedFrame| {
            if trigger.take() {
                let report = pipeline.process_frame(frame, &mut print_item);
                log_report(&report);
            }
            ControlFlow::Continue(())
        }))?;

        info!("Frame source finished");
        Ok(())
    }
}

fn print_item(item: &PricedItem) {
    println!("{}", item.display_line());
}

fn log_report(report: &FrameReport) {
    let priced = report.priced().count();
    if report.cuts > 0 && priced == 0 {
        warn!(
            "Frame {}: {} cuts, nothing priced",
            report.frame, report.cuts
        );
    } else {
        info!(
            "Frame {}: {} of {} cuts priced in {:?}",
            report.frame, priced, report.cuts, report.elapsed
        );
    }
}
