//! Raster images and the registry that owns them.
//!
//! Pixels are stored as linear RGBA floats, row-major with the top row first.
//! The [`ColorSpace`] flag only matters when an image is encoded to or decoded
//! from an 8-bit file.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Handle of an image in an [`ImageRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(u32);

impl ImageId {
    /// Creates a handle from a raw index.
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

/// How 8-bit file values map to the stored linear values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// Display color; files carry sRGB-encoded values.
    Srgb,
    /// Raw data; files carry the values unchanged.
    NonColor,
}

impl ColorSpace {
    /// Encodes a linear value for storage in a file.
    pub fn encode(self, linear: f32) -> f32 {
        match self {
            ColorSpace::Srgb => linear_to_srgb(linear),
            ColorSpace::NonColor => linear,
        }
    }

    /// Decodes a file value to linear.
    pub fn decode(self, encoded: f32) -> f32 {
        match self {
            ColorSpace::Srgb => srgb_to_linear(encoded),
            ColorSpace::NonColor => encoded,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::Srgb => write!(f, "sRGB"),
            ColorSpace::NonColor => write!(f, "Non-Color"),
        }
    }
}

/// sRGB transfer function, encoded to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, linear to encoded.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// A fixed-size raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Image name; also the file stem when persisted.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color-space flag.
    pub color_space: ColorSpace,
    /// Linear RGBA pixels, row-major, top row first.
    pub pixels: Vec<[f32; 4]>,
    /// Backing file, once persisted.
    pub filepath: Option<PathBuf>,
}

impl Image {
    /// Creates an image filled with one value.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        color_space: ColorSpace,
        fill: [f32; 4],
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            color_space,
            pixels: vec![fill; width as usize * height as usize],
            filepath: None,
        }
    }

    /// Creates an image from existing pixels.
    ///
    /// Returns `None` if the pixel count does not match the dimensions.
    pub fn from_pixels(
        name: impl Into<String>,
        width: u32,
        height: u32,
        color_space: ColorSpace,
        pixels: Vec<[f32; 4]>,
    ) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            name: name.into(),
            width,
            height,
            color_space,
            pixels,
            filepath: None,
        })
    }

    /// Get a pixel at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set a pixel at the given coordinates.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: [f32; 4]) {
        let idx = (y * self.width + x) as usize;
        self.pixels[idx] = value;
    }

    /// Fills every pixel with one value.
    pub fn fill(&mut self, value: [f32; 4]) {
        self.pixels.iter_mut().for_each(|p| *p = value);
    }

    /// Sample with bilinear interpolation and repeat wrapping.
    ///
    /// `u` runs left to right and `v` bottom to top.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0, 0.0, 0.0, 1.0];
        }
        let x = u * self.width as f32 - 0.5;
        let y = (1.0 - v) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let wrap = |i: i64, n: u32| i.rem_euclid(n as i64) as u32;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = self.get(wrap(x0, self.width), wrap(y0, self.height));
        let c10 = self.get(wrap(x0 + 1, self.width), wrap(y0, self.height));
        let c01 = self.get(wrap(x0, self.width), wrap(y0 + 1, self.height));
        let c11 = self.get(wrap(x0 + 1, self.width), wrap(y0 + 1, self.height));

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * fx;
            let bottom = c01[i] + (c11[i] - c01[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }

    /// Whether every pixel equals `value`.
    pub fn is_uniform(&self, value: [f32; 4]) -> bool {
        self.pixels.iter().all(|p| *p == value)
    }
}

/// Owner of every image in a scene.
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    images: Vec<Image>,
}

impl ImageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new image filled with `fill`.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        color_space: ColorSpace,
        fill: [f32; 4],
    ) -> ImageId {
        self.insert(Image::new(name, width, height, color_space, fill))
    }

    /// Adds an existing image.
    pub fn insert(&mut self, image: Image) -> ImageId {
        let id = ImageId(self.images.len() as u32);
        self.images.push(image);
        id
    }

    /// Returns an image by handle.
    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id.index())
    }

    /// Returns an image by handle, mutably.
    pub fn get_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images.get_mut(id.index())
    }

    /// Iterates images with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &Image)> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, image)| (ImageId(i as u32), image))
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn srgb_transfer_round_trip_endpoints() {
        assert!(approx_eq(srgb_to_linear(0.0), 0.0));
        assert!(approx_eq(srgb_to_linear(1.0), 1.0));
        assert!(approx_eq(linear_to_srgb(srgb_to_linear(0.5)), 0.5));
        assert!(approx_eq(srgb_to_linear(0.5), 0.214_041));
    }

    #[test]
    fn non_color_is_identity() {
        assert_eq!(ColorSpace::NonColor.encode(0.3), 0.3);
        assert_eq!(ColorSpace::NonColor.decode(0.3), 0.3);
    }

    #[test]
    fn create_fills_every_pixel() {
        let mut registry = ImageRegistry::new();
        let id = registry.create("a", 4, 2, ColorSpace::NonColor, [0.5, 0.5, 0.5, 1.0]);
        let image = registry.get(id).unwrap();
        assert_eq!(image.pixels.len(), 8);
        assert!(image.is_uniform([0.5, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn bilinear_sample_at_texel_center_is_exact() {
        let mut image = Image::new("t", 2, 2, ColorSpace::NonColor, [0.0; 4]);
        image.set(1, 0, [1.0, 1.0, 1.0, 1.0]);
        // Top-right texel center: u = 0.75, v = 0.75.
        let c = image.sample_bilinear(0.75, 0.75);
        assert!(approx_eq(c[0], 1.0));
        let c = image.sample_bilinear(0.25, 0.25);
        assert!(approx_eq(c[0], 0.0));
    }

    #[test]
    fn from_pixels_checks_size() {
        assert!(Image::from_pixels("x", 2, 2, ColorSpace::Srgb, vec![[0.0; 4]; 3]).is_none());
        assert!(Image::from_pixels("x", 2, 2, ColorSpace::Srgb, vec![[0.0; 4]; 4]).is_some());
    }
}
