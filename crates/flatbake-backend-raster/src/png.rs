//! Deterministic PNG writer and the temporary image store.
//!
//! Uses fixed compression settings to ensure byte-identical output for the
//! same pixels. Pixels are encoded through the image's color-space flag, so
//! a color channel lands on disk sRGB-encoded and a data channel lands
//! untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use tempfile::TempDir;
use tracing::debug;

use flatbake_scene::{Image, ImageStore, StoreError};

/// PNG export configuration for deterministic output.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Use a fixed value for determinism.
    pub compression: Compression,
    /// Filter type. Use a fixed value for determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

impl PngConfig {
    /// Create config optimized for file size (slower, but deterministic).
    pub fn best_compression() -> Self {
        Self {
            compression: Compression::Best,
            filter: FilterType::Paeth,
        }
    }
}

/// Encode an image as an 8-bit RGB PNG.
pub fn encode_png(image: &Image, config: &PngConfig) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    write_rgb_to_writer(image, &mut out, config)?;
    Ok(out)
}

fn write_rgb_to_writer<W: Write>(
    image: &Image,
    writer: W,
    config: &PngConfig,
) -> Result<(), StoreError> {
    let encoding = |e: png::EncodingError| StoreError::Encoding {
        name: image.name.clone(),
        message: e.to_string(),
    };

    let mut encoder = Encoder::new(writer, image.width, image.height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header().map_err(encoding)?;
    png_writer
        .write_image_data(&to_rgb8(image))
        .map_err(encoding)?;
    png_writer.finish().map_err(encoding)?;
    Ok(())
}

fn to_rgb8(image: &Image) -> Vec<u8> {
    let cs = image.color_space;
    image
        .pixels
        .iter()
        .flat_map(|p| [p[0], p[1], p[2]])
        .map(|c| (cs.encode(c).clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

/// Keeps characters that are safe in a file name.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    }
}

/// Image store backed by a private temporary directory.
///
/// The directory and every file in it are removed when the store drops, so
/// the store must outlive the export that references its files.
#[derive(Debug)]
pub struct PngImageStore {
    dir: TempDir,
    config: PngConfig,
}

impl PngImageStore {
    /// Creates a store in a fresh system temporary directory.
    pub fn new() -> Result<Self, StoreError> {
        let dir = tempfile::Builder::new()
            .prefix("flatbake_")
            .tempdir()
            .map_err(|source| StoreError::Io {
                name: String::new(),
                path: std::env::temp_dir(),
                source,
            })?;
        Ok(Self {
            dir,
            config: PngConfig::default(),
        })
    }

    /// Replaces the encoder settings.
    pub fn with_config(mut self, config: PngConfig) -> Self {
        self.config = config;
        self
    }

    /// The directory holding persisted images.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    fn path_for(&self, image: &Image) -> PathBuf {
        self.dir.path().join(format!("{}.png", file_stem(&image.name)))
    }
}

impl ImageStore for PngImageStore {
    fn persist(&mut self, image: &mut Image) -> Result<PathBuf, StoreError> {
        let path = self.path_for(image);
        let bytes = encode_png(image, &self.config)?;
        std::fs::write(&path, bytes).map_err(|source| StoreError::Io {
            name: image.name.clone(),
            path: path.clone(),
            source,
        })?;
        debug!(image = %image.name, path = %path.display(), "Persisted image");
        image.filepath = Some(path.clone());
        Ok(path)
    }
}
