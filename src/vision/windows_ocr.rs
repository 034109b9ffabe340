//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr) for word recognition.

use anyhow::{Context, Result};
use image::GrayImage;
use tracing::{debug, info, warn};
use windows::{
    core::HSTRING,
    Foundation::IAsyncOperation,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrResult as WinOcrResult},
    Storage::Streams::{DataReader, DataWriter, InMemoryRandomAccessStream},
};

use super::ocr::TextRecognizer;

/// Windows OCR engine wrapper
pub struct WindowsOcr {
    engine: WinOcrEngine,
}

// SAFETY: OcrEngine is an agile WinRT object
unsafe impl Send for WindowsOcr {}

impl WindowsOcr {
    /// Create a new Windows OCR engine with the specified language
    pub fn new(language_tag: &str) -> Result<Self> {
        info!("Initializing Windows OCR engine with language: {}", language_tag);

        let language = Language::CreateLanguage(&HSTRING::from(language_tag))
            .context("Failed to create language")?;

        if !WinOcrEngine::IsLanguageSupported(&language)
            .context("Failed to check language support")?
        {
            warn!("Language '{}' not supported, falling back to user profile languages", language_tag);
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
                .context("Failed to create OCR engine from user profile")?;

            let lang_tag = engine
                .RecognizerLanguage()
                .context("Failed to get recognizer language")?
                .LanguageTag()
                .context("Failed to get language tag")?
                .to_string();

            info!("Windows OCR initialized with language: {}", lang_tag);
            return Ok(Self { engine });
        }

        let engine = WinOcrEngine::TryCreateFromLanguage(&language)
            .context("Failed to create OCR engine for language")?;

        info!("Windows OCR initialized with language: {}", language_tag);
        Ok(Self { engine })
    }
}

impl TextRecognizer for WindowsOcr {
    fn name(&self) -> &'static str {
        "windows_ocr"
    }

    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<String>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(vec![]);
        }

        let bgra = gray_to_bgra(image);
        let bitmap = create_software_bitmap(&bgra, width, height)?;
        let result = run_ocr_sync(&self.engine, &bitmap)?;
        let words = extract_words(&result)?;

        debug!("Windows OCR: {} words in {}x{} cut", words.len(), width, height);
        Ok(words)
    }
}

/// Expand a grayscale image to opaque BGRA
fn gray_to_bgra(image: &GrayImage) -> Vec<u8> {
    image
        .as_raw()
        .iter()
        .flat_map(|&v| [v, v, v, 255])
        .collect()
}

/// Create a SoftwareBitmap from BGRA data using CopyFromBuffer
fn create_software_bitmap(bgra_data: &[u8], width: u32, height: u32) -> Result<SoftwareBitmap> {
    let stream = InMemoryRandomAccessStream::new().context("Failed to create in-memory stream")?;

    let writer = DataWriter::CreateDataWriter(&stream).context("Failed to create data writer")?;
    writer.WriteBytes(bgra_data).context("Failed to write pixel data")?;
    writer
        .StoreAsync()
        .context("Failed to start store operation")?
        .get()
        .context("Failed to store data")?;
    writer
        .FlushAsync()
        .context("Failed to start flush operation")?
        .get()
        .context("Failed to flush data")?;

    let bitmap = SoftwareBitmap::Create(BitmapPixelFormat::Bgra8, width as i32, height as i32)
        .context("Failed to create SoftwareBitmap")?;

    let input_stream = stream.GetInputStreamAt(0).context("Failed to get input stream")?;
    let reader = DataReader::CreateDataReader(&input_stream).context("Failed to create data reader")?;
    reader
        .LoadAsync(bgra_data.len() as u32)
        .context("Failed to start load operation")?
        .get()
        .context("Failed to load data")?;
    let buffer = reader
        .ReadBuffer(bgra_data.len() as u32)
        .context("Failed to read buffer")?;

    bitmap
        .CopyFromBuffer(&buffer)
        .context("Failed to copy buffer to bitmap")?;

    Ok(bitmap)
}

/// Run OCR synchronously (blocks until complete)
fn run_ocr_sync(engine: &WinOcrEngine, bitmap: &SoftwareBitmap) -> Result<WinOcrResult> {
    let async_op: IAsyncOperation<WinOcrResult> = engine
        .RecognizeAsync(bitmap)
        .context("Failed to start OCR recognition")?;

    async_op.get().context("OCR recognition failed")
}

/// Flatten lines into words, in reading order
fn extract_words(ocr_result: &WinOcrResult) -> Result<Vec<String>> {
    let mut words_out = Vec::new();

    let lines = ocr_result.Lines().context("Failed to get OCR lines")?;
    for i in 0..lines.Size().context("Failed to get lines size")? {
        let line = lines.GetAt(i).context("Failed to get line")?;
        let words = line.Words().context("Failed to get words")?;

        for j in 0..words.Size().context("Failed to get words size")? {
            let word = words.GetAt(j).context("Failed to get word")?;
            words_out.push(word.Text().context("Failed to get word text")?.to_string());
        }
    }

    Ok(words_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_gray_to_bgra() {
        let img = GrayImage::from_pixel(2, 1, Luma([7]));
        assert_eq!(gray_to_bgra(&img), vec![7, 7, 7, 255, 7, 7, 7, 255]);
    }

    #[test]
    fn test_blank_image_has_no_words() {
        let engine = WindowsOcr::new("en-US").unwrap();
        let blank = GrayImage::from_pixel(200, 60, Luma([255]));
        assert!(engine.recognize_words(&blank).unwrap().is_empty());
    }
}
