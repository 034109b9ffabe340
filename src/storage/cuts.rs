//! Saves item-card cuts to disk so recognition problems can be inspected

use anyhow::{Context, Result};
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Writes cuts as PNG files into one directory
#[derive(Debug, Clone)]
pub struct CutWriter {
    dir: PathBuf,
}

impl CutWriter {
    /// Create a writer, creating the directory if needed
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cut directory {:?}", dir))?;
        Ok(Self { dir })
    }

    /// Writer under `<data_dir>/cuts`
    pub fn in_data_dir() -> Result<Self> {
        Self::new(super::get_data_dir()?.join("cuts"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name used for the `index`-th cut of frame `frame`
    pub fn file_name(frame: u64, index: usize) -> String {
        format!("frame{:05}_cut{:02}.png", frame, index)
    }

    /// Save one cut, returning the written path
    pub fn save(&self, frame: u64, index: usize, pixels: &GrayImage) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(frame, index));
        pixels
            .save(&path)
            .with_context(|| format!("Failed to save cut {:?}", path))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_file_name_is_zero_padded() {
        assert_eq!(CutWriter::file_name(7, 3), "frame00007_cut03.png");
    }

    #[test]
    fn test_save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CutWriter::new(dir.path().join("cuts")).unwrap();
        let cut = GrayImage::from_pixel(4, 3, Luma([255]));

        let path = writer.save(1, 0, &cut).unwrap();

        assert!(path.exists());
        let loaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (4, 3));
    }
}
