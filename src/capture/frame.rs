//! Frame data structures for captured screen content

/// A captured frame from the screen
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw RGBA pixel data, row-major, no row padding
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl CapturedFrame {
    /// Create a new captured frame
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Create a frame from a decoded image
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(rgba.into_raw(), width, height)
    }

    /// Whether the buffer holds exactly `width * height` RGBA pixels
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 4
    }
}
