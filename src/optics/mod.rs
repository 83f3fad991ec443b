//! The physical side of the link: what gets lit, what gets filmed.

use crate::error::CaptureError;

mod status;
pub use status::{LogSink, StatusEvent, StatusSink};

pub mod scripted;

/// Luminance states a display can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Luminance {
    High,
    Low,
}

impl From<bool> for Luminance {
    fn from(bit: bool) -> Self {
        if bit {
            Luminance::High
        } else {
            Luminance::Low
        }
    }
}

pub trait DisplaySurface: Send {
    /// Called once before the first state of a transmission.
    fn open(&mut self) {}

    fn set_state(&mut self, state: Luminance);

    fn close(&mut self) {}
}

pub trait CaptureDevice: Send {
    fn open(&mut self) -> Result<(), CaptureError>;

    /// `CaptureError::Transient` means "no frame this time"; any other error
    /// ends the receive session.
    fn read_frame(&mut self) -> Result<LumaFrame, CaptureError>;

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    /// Interleaved blue, green, red bytes.
    Bgr8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Bgr8 => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LumaFrame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl LumaFrame {
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = width * height * format.channels();
        if data.len() != expected {
            return Err(CaptureError::MalformedFrame {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn uniform(width: usize, height: usize, level: u8) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Gray8,
            data: vec![level; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn luminance(&self, x: usize, y: usize) -> f32 {
        let offset = (y * self.width + x) * self.format.channels();
        match self.format {
            PixelFormat::Gray8 => self.data[offset] as f32,
            PixelFormat::Bgr8 => {
                let (b, g, r) = (
                    self.data[offset] as f32,
                    self.data[offset + 1] as f32,
                    self.data[offset + 2] as f32,
                );
                0.299 * r + 0.587 * g + 0.114 * b
            }
        }
    }
}

/// Mean luminance of the square `[c - half_width, c + half_width)` around
/// the frame center on both axes, clamped to the frame.
pub fn center_brightness(frame: &LumaFrame, half_width: usize) -> f32 {
    let (center_x, center_y) = (frame.width / 2, frame.height / 2);

    let x_range = center_x.saturating_sub(half_width)..(center_x + half_width).min(frame.width);
    let y_range = center_y.saturating_sub(half_width)..(center_y + half_width).min(frame.height);

    let pixels = x_range.len() * y_range.len();
    if pixels == 0 {
        return 0.0;
    }

    let total = y_range
        .flat_map(|y| x_range.clone().map(move |x| (x, y)))
        .map(|(x, y)| frame.luminance(x, y) as f64)
        .sum::<f64>();

    (total / pixels as f64) as f32
}
