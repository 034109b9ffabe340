//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture settings
    pub capture: CaptureSettings,
    /// Hotkey settings
    pub hotkey: HotkeySettings,
    /// Mask and region extraction parameters
    pub vision: VisionSettings,
    /// Text recognition settings
    pub ocr: OcrSettings,
    /// Keyword filters applied to recognized text
    pub filter: FilterSettings,
    /// Market (catalog and price) settings
    pub market: MarketSettings,
    /// Debug settings
    pub debug: DebugSettings,
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSourceKind {
    /// Live screen capture (Windows Graphics Capture)
    #[default]
    Screen,
    /// Image files replayed from a directory
    Replay,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Frame source
    pub source: CaptureSourceKind,
    /// Directory of screenshots for the replay source
    pub replay_dir: Option<PathBuf>,
    /// Restart the replay from the first image once exhausted
    pub loop_replay: bool,
    /// Maximum frames per second delivered to the pipeline
    pub max_fps: u32,
    /// Monitor to capture (0 = primary)
    pub monitor_index: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: CaptureSourceKind::Screen,
            replay_dir: None,
            loop_replay: false,
            max_fps: 10,
            monitor_index: 0,
        }
    }
}

/// Hotkey settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    /// Key combination that requests a price check, e.g. "F9" or "Ctrl+Shift+P"
    pub trigger: String,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            trigger: "F9".to_string(),
        }
    }
}

/// Mask builder and region extractor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    /// Lower bound of the per-channel "bright text" band (upper bound is 255)
    pub content_threshold: u8,
    /// Kernel size of the first box blur on the counter mask
    pub first_blur: u32,
    /// Binarizing cutoff after the first blur
    pub first_cutoff: u8,
    /// Kernel size of the second box blur on the counter mask
    pub second_blur: u32,
    /// Binarizing cutoff after the second blur
    pub second_cutoff: u8,
    /// Final cutoff producing the 0/255 connectivity mask
    pub counter_cutoff: u8,
    /// Height multiplier applied when padding a bounding rectangle
    pub height_padding: f32,
    /// Merged rectangles with an area at or below this are dropped
    pub min_area: u32,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            content_threshold: 224,
            first_blur: 3,
            first_cutoff: 48,
            second_blur: 5,
            second_cutoff: 32,
            counter_cutoff: 1,
            height_padding: 1.2,
            min_area: 1000,
        }
    }
}

/// Text recognition backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Tesseract command line executable
    #[default]
    Tesseract,
    /// Windows built-in OCR
    WindowsOcr,
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// OCR backend to use
    pub backend: OcrBackend,
    /// Path to the tesseract executable (looked up on PATH when unset)
    pub tesseract_path: Option<PathBuf>,
    /// Recognition language ("eng" for tesseract, "en-US" for Windows OCR)
    pub language: String,
    /// Tesseract page segmentation mode
    pub page_segmentation: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            tesseract_path: None,
            language: "eng".to_string(),
            page_segmentation: 6,
        }
    }
}

/// Keyword filters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// A cut passes only if one of its words is in this set
    pub include: Vec<String>,
    /// Words dropped from the resolved text
    pub exclude: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            include: vec!["prime".to_string(), "forma".to_string()],
            exclude: vec![
                "[intact]".to_string(),
                "[exceptional]".to_string(),
                "[flawless]".to_string(),
                "[radiant]".to_string(),
            ],
        }
    }
}

/// Market settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// API root, without trailing slash
    pub base_url: String,
    /// Platform header sent with every request
    pub platform: String,
    /// Language header sent with every request
    pub language: String,
    /// Only count orders from users currently in game
    pub online_only: bool,
    /// Pause after each priced item
    pub rate_limit_ms: u64,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.warframe.market/v1".to_string(),
            platform: "pc".to_string(),
            language: "en".to_string(),
            online_only: true,
            rate_limit_ms: 1000,
            request_timeout_secs: 10,
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Save every cut as a PNG before recognition
    pub save_cuts: bool,
    /// Override for the cut directory (defaults to `<data_dir>/cuts`)
    pub cuts_dir: Option<PathBuf>,
}

impl FilterSettings {
    /// Lower-case and trim every keyword, dropping empty ones
    pub fn normalize(&mut self) {
        fn clean(words: &mut Vec<String>) {
            *words = words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();
        }
        clean(&mut self.include);
        clean(&mut self.exclude);
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    config.filter.normalize();
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.capture.source, CaptureSourceKind::Screen);
        assert_eq!(config.hotkey.trigger, "F9");

        assert_eq!(config.vision.content_threshold, 224);
        assert_eq!(config.vision.first_blur, 3);
        assert_eq!(config.vision.first_cutoff, 48);
        assert_eq!(config.vision.second_blur, 5);
        assert_eq!(config.vision.second_cutoff, 32);
        assert_eq!(config.vision.min_area, 1000);
        assert!((config.vision.height_padding - 1.2).abs() < 0.001);

        assert_eq!(config.ocr.backend, OcrBackend::Tesseract);
        assert_eq!(config.market.rate_limit_ms, 1000);
        assert!(!config.debug.save_cuts);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.vision.min_area, parsed.vision.min_area);
        assert_eq!(config.filter.include, parsed.filter.include);
        assert_eq!(config.market.base_url, parsed.market.base_url);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[filter]\ninclude = [\"  Relic \", \"\"]\n\n[market]\nrate_limit_ms = 0").unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.filter.include, vec!["relic".to_string()]);
        assert_eq!(config.market.rate_limit_ms, 0);
        assert_eq!(config.market.platform, "pc");
        assert_eq!(config.vision.content_threshold, 224);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.capture.source = CaptureSourceKind::Replay;
        config.capture.replay_dir = Some(PathBuf::from("/tmp/frames"));

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.capture.source, CaptureSourceKind::Replay);
        assert_eq!(loaded.capture.replay_dir, Some(PathBuf::from("/tmp/frames")));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
