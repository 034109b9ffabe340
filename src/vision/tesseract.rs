//! Tesseract backend
//!
//! Runs the `tesseract` executable on a temporary PNG and reads word-level
//! TSV from stdout.

use anyhow::{anyhow, ensure, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::ocr::TextRecognizer;
use crate::config::OcrSettings;

/// TSV level of word rows
const WORD_LEVEL: i32 = 5;

/// Tesseract command line wrapper
pub struct TesseractCli {
    executable: PathBuf,
    language: String,
    page_segmentation: u8,
}

impl TesseractCli {
    /// Locate tesseract and check that it runs
    pub fn new(settings: &OcrSettings) -> Result<Self> {
        let executable = settings
            .tesseract_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_executable()));

        let output = Command::new(&executable)
            .arg("--version")
            .output()
            .with_context(|| format!("Failed to run tesseract at {:?}", executable))?;
        ensure!(
            output.status.success(),
            "tesseract --version failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        // Older builds print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        info!(
            "Tesseract backend ready: {}",
            banner.lines().next().unwrap_or("unknown version")
        );

        Ok(Self {
            executable,
            language: settings.language.clone(),
            page_segmentation: settings.page_segmentation,
        })
    }
}

fn default_executable() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<String>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(vec![]);
        }

        let input = NamedTempFile::with_suffix(".png")?;
        image
            .save(input.path())
            .context("Failed to write cut for tesseract")?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation.to_string())
            .arg("tsv")
            .output()
            .context("Failed to run tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let words = parse_tsv_words(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "Tesseract: {} words in {}x{} cut",
            words.len(),
            image.width(),
            image.height()
        );
        Ok(words)
    }
}

/// Extract word texts from tesseract TSV output, in reading order
fn parse_tsv_words(tsv: &str) -> Vec<String> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            // level, page_num, block_num, par_num, line_num, word_num,
            // left, top, width, height, conf, text
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 {
                return None;
            }
            let level: i32 = fields[0].parse().unwrap_or(-1);
            let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
            let text = fields[11].trim();
            (level == WORD_LEVEL && conf >= 0.0 && !text.is_empty()).then(|| text.to_string())
        })
        .collect()
}
