//! Replays screenshots from disk as if they were captured live

use anyhow::{ensure, Context, Result};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::frame::CapturedFrame;
use super::{frame_interval, FrameCallback, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Image files delivered in name order, paced to `max_fps`
#[derive(Debug, Clone)]
pub struct ReplaySource {
    files: Vec<PathBuf>,
    interval: Option<Duration>,
    looping: bool,
}

impl ReplaySource {
    /// All images directly inside `dir`, sorted by file name
    pub fn from_dir(dir: &Path, max_fps: u32, looping: bool) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read replay directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();
        ensure!(!files.is_empty(), "No images found in {:?}", dir);

        info!("Replaying {} images from {:?}", files.len(), dir);
        Ok(Self {
            files,
            interval: frame_interval(max_fps),
            looping,
        })
    }

    /// One image, delivered once
    pub fn single(path: PathBuf) -> Self {
        Self {
            files: vec![path],
            interval: None,
            looping: false,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn run(self: Box<Self>, mut on_frame: FrameCallback) -> Result<()> {
        let mut next_due = Instant::now();
        loop {
            let mut delivered = 0usize;
            for path in &self.files {
                let image = match image::open(path) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!("Skipping {:?}: {}", path, e);
                        continue;
                    }
                };

                if let Some(interval) = self.interval {
                    let now = Instant::now();
                    if next_due > now {
                        std::thread::sleep(next_due - now);
                    }
                    next_due = Instant::now() + interval;
                }

                debug!("Replaying {:?}", path);
                delivered += 1;
                if on_frame(&CapturedFrame::from_image(&image)).is_break() {
                    return Ok(());
                }
            }

            ensure!(delivered > 0, "None of the replay images could be decoded");
            if !self.looping {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn write_image(dir: &Path, name: &str, width: u32) {
        RgbImage::from_pixel(width, 4, Rgb([10, 20, 30]))
            .save(dir.join(name))
            .unwrap();
    }

    fn collect_widths(source: ReplaySource) -> Vec<u32> {
        let widths = Arc::new(Mutex::new(Vec::new()));
        let sink = widths.clone();
        Box::new(source)
            .run(Box::new(move |frame: &CapturedFrame| {
                let mut sink = sink.lock();
                sink.push(frame.width);
                if sink.len() >= 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }))
            .unwrap();
        let widths = widths.lock().clone();
        widths
    }

    #[test]
    fn test_replays_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 2);
        write_image(dir.path(), "a.png", 1);
        write_image(dir.path(), "c.bmp", 3);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let source = ReplaySource::from_dir(dir.path(), 0, false).unwrap();

        assert_eq!(collect_widths(source), vec![1, 2, 3]);
    }

    #[test]
    fn test_looping_restarts() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 1);
        write_image(dir.path(), "b.png", 2);

        let source = ReplaySource::from_dir(dir.path(), 0, true).unwrap();

        assert_eq!(collect_widths(source), vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_frames_are_rgba() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 3);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        Box::new(ReplaySource::single(dir.path().join("a.png")))
            .run(Box::new(move |frame: &CapturedFrame| {
                *sink.lock() = Some((frame.is_well_formed(), frame.data[..4].to_vec()));
                ControlFlow::Continue(())
            }))
            .unwrap();

        assert_eq!(*seen.lock(), Some((true, vec![10, 20, 30, 255])));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReplaySource::from_dir(dir.path(), 10, false).is_err());
        assert!(ReplaySource::from_dir(&dir.path().join("missing"), 10, false).is_err());
    }

    #[test]
    fn test_undecodable_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"garbage").unwrap();
        write_image(dir.path(), "b.png", 2);

        let source = ReplaySource::from_dir(dir.path(), 0, false).unwrap();

        assert_eq!(collect_widths(source), vec![2]);
    }

    #[test]
    fn test_nothing_decodable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"garbage").unwrap();

        let source = ReplaySource::from_dir(dir.path(), 0, true).unwrap();

        assert!(Box::new(source)
            .run(Box::new(|_: &CapturedFrame| ControlFlow::Continue(())))
            .is_err());
    }
}
