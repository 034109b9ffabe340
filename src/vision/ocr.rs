//! Text recognition backends
//!
//! The pipeline only needs "image -> words in reading order". Backends:
//! - Tesseract command line (all platforms)
//! - Windows OCR API (Windows only)

use anyhow::Result;
use image::GrayImage;

use crate::config::{OcrBackend, OcrSettings};

/// Black-box word recognizer
pub trait TextRecognizer: Send {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Recognize the words in `image`, in reading order.
    ///
    /// An image without text yields an empty list, not an error.
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<String>>;
}

/// Initialize the configured backend. Failure here is fatal for the application.
pub fn create_recognizer(settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    match settings.backend {
        OcrBackend::Tesseract => Ok(Box::new(super::tesseract::TesseractCli::new(settings)?)),
        OcrBackend::WindowsOcr => create_windows_ocr(settings),
    }
}

#[cfg(windows)]
fn create_windows_ocr(settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    Ok(Box::new(super::windows_ocr::WindowsOcr::new(&settings.language)?))
}

#[cfg(not(windows))]
fn create_windows_ocr(_settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    anyhow::bail!("Windows OCR backend is only available on Windows")
}
