//! Frame pipeline
//!
//! Runs one frame through mask building, region extraction, cut production,
//! text resolution and pricing. A frame run never fails: every problem is
//! confined to the cut (or frame) it happened in and recorded in the report.

use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::analysis::TextResolver;
use crate::capture::frame::CapturedFrame;
use crate::config::VisionSettings;
use crate::market::{Catalog, PriceQuote, PriceSource, PricedItem};
use crate::storage::CutWriter;
use crate::vision::{produce_cuts, MaskBuilder, RegionExtractor};

/// Minimum similarity for a catalog suggestion in the logs
const SUGGESTION_SIMILARITY: f64 = 0.8;

/// What happened to one cut
#[derive(Debug, Clone, PartialEq)]
pub enum CutOutcome {
    /// No inclusion keyword among the recognized words
    NoMatch { raw: String },
    /// The recognition engine failed on this cut
    RecognitionFailed(String),
    /// Text passed the filters but is not a catalog item
    CatalogMiss {
        text: String,
        suggestion: Option<String>,
    },
    /// Price fetch failed or returned malformed data
    PriceFailed { text: String, error: String },
    Priced(PricedItem),
}

/// Summary of one frame run
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Sequence number of the frame within this session
    pub frame: u64,
    pub regions: usize,
    pub cuts: usize,
    /// One entry per cut, in cut order
    pub outcomes: Vec<CutOutcome>,
    pub elapsed: Duration,
}

impl FrameReport {
    /// Cuts whose text passed the keyword filters
    pub fn recognized(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                !matches!(
                    o,
                    CutOutcome::NoMatch { .. } | CutOutcome::RecognitionFailed(_)
                )
            })
            .count()
    }

    pub fn priced(&self) -> impl Iterator<Item = &PricedItem> {
        self.outcomes.iter().filter_map(|o| match o {
            CutOutcome::Priced(item) => Some(item),
            _ => None,
        })
    }
}

/// Owns every stage and the collaborators they need
pub struct FramePipeline {
    masks: MaskBuilder,
    regions: RegionExtractor,
    resolver: TextResolver,
    catalog: Catalog,
    prices: Box<dyn PriceSource>,
    cut_writer: Option<CutWriter>,
    rate_limit: Duration,
    frames_processed: u64,
}

impl FramePipeline {
    pub fn new(
        vision: &VisionSettings,
        resolver: TextResolver,
        catalog: Catalog,
        prices: Box<dyn PriceSource>,
        rate_limit: Duration,
    ) -> Self {
        Self {
            masks: MaskBuilder::new(vision.clone()),
            regions: RegionExtractor::new(vision),
            resolver,
            catalog,
            prices,
            cut_writer: None,
            rate_limit,
            frames_processed: 0,
        }
    }

    /// Save every cut through `writer` before recognition
    pub fn with_cut_writer(mut self, writer: CutWriter) -> Self {
        self.cut_writer = Some(writer);
        self
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Run one frame to completion. `on_item` sees each priced item as soon as it is priced.
    pub fn process_frame(
        &mut self,
        frame: &CapturedFrame,
        on_item: &mut dyn FnMut(&PricedItem),
    ) -> FrameReport {
        let start = Instant::now();
        self.frames_processed += 1;
        let mut report = FrameReport {
            frame: self.frames_processed,
            ..Default::default()
        };

        let masks = match self.masks.build(frame) {
            Ok(masks) => masks,
            Err(e) => {
                error!("Frame {} skipped: {:#}", report.frame, e);
                report.elapsed = start.elapsed();
                return report;
            }
        };

        let rects = self.regions.extract(&masks.counters);
        report.regions = rects.len();

        let cuts = produce_cuts(&rects, &masks.masked);
        report.cuts = cuts.len();
        drop(masks);

        for (index, cut) in cuts.iter().enumerate() {
            if let Some(writer) = &self.cut_writer {
                if let Err(e) = writer.save(report.frame, index, &cut.pixels) {
                    warn!("Could not persist cut {}: {:#}", index, e);
                }
            }

            let outcome = self.price_cut(cut);
            if let CutOutcome::Priced(item) = &outcome {
                on_item(item);
                let more_cuts = index + 1 < cuts.len();
                if more_cuts && !self.rate_limit.is_zero() {
                    std::thread::sleep(self.rate_limit);
                }
            }
            report.outcomes.push(outcome);
        }

        report.elapsed = start.elapsed();
        debug!(
            "Frame {}: {} regions, {} cuts, {} recognized, {} priced in {:?}",
            report.frame,
            report.regions,
            report.cuts,
            report.recognized(),
            report.priced().count(),
            report.elapsed
        );
        report
    }

    fn price_cut(&self, cut: &crate::vision::Cut) -> CutOutcome {
        let recognized = match self.resolver.resolve(cut) {
            Ok(recognized) => recognized,
            Err(e) => {
                warn!("Recognition failed for {:?}: {:#}", cut.rect, e);
                return CutOutcome::RecognitionFailed(format!("{:#}", e));
            }
        };

        let Some(text) = recognized.text() else {
            debug!("No keyword in {:?}: {:?}", cut.rect, recognized.raw_text());
            return CutOutcome::NoMatch {
                raw: recognized.raw_text(),
            };
        };

        let Some(entry) = self.catalog.lookup(&text) else {
            let suggestion = self
                .catalog
                .closest(&text, SUGGESTION_SIMILARITY)
                .map(|(name, _)| name.to_string());
            match &suggestion {
                Some(name) => info!("'{}' is not in the catalog (did you mean '{}'?)", text, name),
                None => info!("'{}' is not in the catalog", text),
            }
            return CutOutcome::CatalogMiss { text, suggestion };
        };

        match self.prices.fetch_orders(&entry.slug) {
            Ok(book) => {
                let quote = PriceQuote::from_orders(book.sell, book.buy);
                debug!(
                    "'{}': {} sell and {} buy prices",
                    entry.slug,
                    quote.sell_count(),
                    quote.buy_count()
                );
                CutOutcome::Priced(PricedItem {
                    quote,
                    entry: entry.clone(),
                    text,
                })
            }
            Err(e) => {
                warn!("Price lookup for '{}' failed: {}", entry.slug, e);
                CutOutcome::PriceFailed {
                    text,
                    error: e.to_string(),
                }
            }
        }
    }
}
