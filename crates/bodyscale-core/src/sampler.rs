//! Segmentation mask sampling and foreground classification.
//!
//! The mask stores premultiplied RGBA8 pixels. Sampling un-premultiplies
//! each pixel to recover its true colour; fully transparent pixels have
//! no recoverable colour and come back as [`Sample::Indeterminate`].

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, EstimateError, Point};

/// A normalized, straight-alpha colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Opacity; colour channels are not multiplied by it.
    pub a: f64,
}

/// The colour recovered from one mask pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sample {
    /// Un-premultiplied colour.
    Color(Rgba),
    /// Zero-alpha pixel; its colour channels carry no information.
    Indeterminate,
}

impl Sample {
    /// The recovered colour.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::IndeterminateColor`] for zero-alpha pixels.
    pub const fn color(self) -> Result<Rgba, EstimateError> {
        match self {
            Self::Color(c) => Ok(c),
            Self::Indeterminate => Err(EstimateError::IndeterminateColor),
        }
    }
}

/// Decides whether a sampled colour belongs to the body silhouette.
///
/// A colour is foreground when each of its red, green and blue channels
/// lies within `tolerance` of the target colour. Alpha is not compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForegroundClassifier {
    /// Target colour as `[r, g, b]` in `[0, 1]`.
    pub color: [f64; 3],
    /// Maximum per-channel deviation from the target.
    pub tolerance: f64,
}

impl ForegroundClassifier {
    /// Segmentation renderers paint the person solid white.
    pub const DEFAULT_COLOR: [f64; 3] = [1.0, 1.0, 1.0];

    /// Absorbs 8-bit quantisation without admitting anti-aliased edges.
    pub const DEFAULT_TOLERANCE: f64 = 1e-3;

    /// Returns `true` if the sample is a body pixel.
    #[must_use]
    pub fn is_body(&self, sample: &Sample) -> bool {
        match sample {
            Sample::Color(c) => self.is_body_color(c),
            Sample::Indeterminate => false,
        }
    }

    /// Returns `true` if the colour matches the target within tolerance.
    #[must_use]
    pub fn is_body_color(&self, color: &Rgba) -> bool {
        [color.r, color.g, color.b]
            .iter()
            .zip(self.color)
            .all(|(channel, target)| (channel - target).abs() <= self.tolerance)
    }
}

impl Default for ForegroundClassifier {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// A person segmentation mask with premultiplied RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    image: RgbaImage,
}

impl SegmentationMask {
    /// Wrap an image whose pixels are already premultiplied.
    #[must_use]
    pub const fn from_premultiplied(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap a straight-alpha image, premultiplying every pixel.
    #[must_use]
    pub fn from_straight(mut image: RgbaImage) -> Self {
        for pixel in image.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            pixel.0 = [premultiply(r, a), premultiply(g, a), premultiply(b, a), a];
        }
        Self { image }
    }

    /// Decode raw image bytes (PNG, JPEG, BMP, WebP) into a mask.
    ///
    /// Decoded images carry straight alpha and are premultiplied on load.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::EmptyInput`] if `bytes` is empty.
    /// Returns [`EstimateError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, EstimateError> {
        if bytes.is_empty() {
            return Err(EstimateError::EmptyInput);
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_straight(img.to_rgba8()))
    }

    /// Mask size in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// The underlying premultiplied pixels.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Sample the pixel containing `point` (coordinates are floored).
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] if the point lies outside
    /// the mask.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self, point: Point) -> Result<Sample, EstimateError> {
        let out_of_bounds = EstimateError::OutOfBounds {
            x: point.x,
            y: point.y,
        };
        let x = point.x.floor();
        let y = point.y.floor();
        if !(x >= 0.0
            && y >= 0.0
            && x < f64::from(self.image.width())
            && y < f64::from(self.image.height()))
        {
            return Err(out_of_bounds);
        }

        // Bounds checked above, so both casts are exact.
        let [r, g, b, a] = self.image.get_pixel(x as u32, y as u32).0;
        Ok(unpremultiply(r, g, b, a))
    }

    /// Sample every point, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] for the first point that
    /// lies outside the mask.
    pub fn sample_colors(&self, points: &[Point]) -> Result<Vec<Sample>, EstimateError> {
        points.iter().map(|&p| self.sample(p)).collect()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn premultiply(channel: u8, alpha: u8) -> u8 {
    let value = (f64::from(channel) * f64::from(alpha) / 255.0).round();
    value.clamp(0.0, 255.0) as u8
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> Sample {
    if a == 0 {
        return Sample::Indeterminate;
    }
    let alpha = f64::from(a);
    let channel = |c: u8| (f64::from(c) / alpha).min(1.0);
    Sample::Color(Rgba {
        r: channel(r),
        g: channel(g),
        b: channel(b),
        a: alpha / 255.0,
    })
}
