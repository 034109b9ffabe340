//! Vision Layer
//!
//! Frame triage: mask construction, region extraction, cut production and
//! the text recognition backends that read the cuts.
//! Supports multiple OCR backends:
//! - Tesseract command line (all platforms)
//! - Windows OCR API (Windows only)

pub mod cuts;
pub mod mask;
pub mod ocr;
pub mod regions;
pub mod tesseract;
#[cfg(windows)]
pub mod windows_ocr;

pub use cuts::{produce_cuts, Cut};
pub use mask::MaskBuilder;
pub use ocr::{create_recognizer, TextRecognizer};
pub use regions::{Rect, RegionExtractor};
