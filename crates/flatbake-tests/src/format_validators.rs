//! Output format validators for test infrastructure.
//!
//! Parse converted files and return structured information about their
//! contents, so tests assert on what a downstream consumer would see.

use std::fmt;

use flatbake_interchange::fbx::{self, Document, Node, Property};

/// Error type for format validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    /// The format being validated.
    pub format: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl FormatError {
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.format, self.message)
    }
}

impl std::error::Error for FormatError {}

/// Information extracted from a PNG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngInfo {
    pub width: u32,
    pub height: u32,
    pub color_type: png::ColorType,
    pub bit_depth: png::BitDepth,
}

/// Validates a PNG and decodes its header.
pub fn validate_png(data: &[u8]) -> Result<PngInfo, FormatError> {
    let reader = png::Decoder::new(data)
        .read_info()
        .map_err(|e| FormatError::new("PNG", e.to_string()))?;
    let info = reader.info();
    if info.width == 0 || info.height == 0 {
        return Err(FormatError::new("PNG", "image has zero size"));
    }
    Ok(PngInfo {
        width: info.width,
        height: info.height,
        color_type: info.color_type,
        bit_depth: info.bit_depth,
    })
}

/// Decodes an 8-bit RGB or RGBA PNG to RGB triples.
pub fn png_rgb_pixels(data: &[u8]) -> Result<Vec<[u8; 3]>, FormatError> {
    let mut reader = png::Decoder::new(data)
        .read_info()
        .map_err(|e| FormatError::new("PNG", e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| FormatError::new("PNG", e.to_string()))?;
    if frame.bit_depth != png::BitDepth::Eight {
        return Err(FormatError::new("PNG", "expected 8-bit samples"));
    }
    let stride = match frame.color_type {
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        other => return Err(FormatError::new("PNG", format!("unexpected color type {other:?}"))),
    };
    Ok(buf[..frame.buffer_size()]
        .chunks_exact(stride)
        .map(|px| [px[0], px[1], px[2]])
        .collect())
}

/// A texture embedded in an FBX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbxTexture {
    /// Image name, without the FBX class suffix.
    pub name: String,
    /// Embedded file contents, if any.
    pub content: Option<Vec<u8>>,
}

/// A mesh model in an FBX file.
#[derive(Debug, Clone, PartialEq)]
pub struct FbxGeometry {
    pub name: String,
    pub vertices: Vec<f64>,
    /// Per-corner UV pairs; empty without a UV layer.
    pub uvs: Vec<f64>,
}

impl FbxGeometry {
    pub fn has_uv(&self) -> bool {
        !self.uvs.is_empty()
    }
}

/// Information extracted from a binary FBX file.
#[derive(Debug, Clone, PartialEq)]
pub struct FbxInfo {
    pub version: u32,
    pub models: Vec<String>,
    pub materials: Vec<String>,
    pub geometries: Vec<FbxGeometry>,
    pub textures: Vec<FbxTexture>,
    /// Material property each texture is plugged into, e.g. `DiffuseColor`.
    pub texture_slots: Vec<String>,
}

impl FbxInfo {
    pub fn texture(&self, name: &str) -> Option<&FbxTexture> {
        self.textures.iter().find(|t| t.name == name)
    }

    pub fn geometry(&self, name: &str) -> Option<&FbxGeometry> {
        self.geometries.iter().find(|g| g.name == name)
    }
}

/// Validates a binary FBX file and collects its objects.
pub fn validate_fbx(data: &[u8]) -> Result<FbxInfo, FormatError> {
    let document = fbx::from_bytes(data).map_err(|e| FormatError::new("FBX", e.to_string()))?;
    let objects = document
        .find("Objects")
        .ok_or_else(|| FormatError::new("FBX", "missing Objects section"))?;

    let names = |class: &str| -> Vec<String> {
        objects
            .find_all(class)
            .filter_map(|n| object_name(n).map(str::to_string))
            .collect()
    };

    let geometries = objects
        .find_all("Geometry")
        .map(|node| {
            let name = object_name(node)
                .ok_or_else(|| FormatError::new("FBX", "geometry without a name"))?
                .to_string();
            let vertices = match node.find("Vertices").and_then(|v| v.properties.first()) {
                Some(Property::F64Array(values)) => values.clone(),
                _ => return Err(FormatError::new("FBX", format!("geometry '{name}' has no vertices"))),
            };
            let uvs = match node
                .find("LayerElementUV")
                .and_then(|layer| layer.find("UV"))
                .and_then(|uv| uv.properties.first())
            {
                Some(Property::F64Array(values)) => values.clone(),
                _ => Vec::new(),
            };
            Ok(FbxGeometry {
                name,
                vertices,
                uvs,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let textures = objects
        .find_all("Video")
        .map(|node| FbxTexture {
            name: object_name(node).unwrap_or_default().to_string(),
            content: match node.find("Content").and_then(|c| c.properties.first()) {
                Some(Property::Raw(bytes)) => Some(bytes.clone()),
                _ => None,
            },
        })
        .collect();

    Ok(FbxInfo {
        version: document.version,
        models: names("Model"),
        materials: names("Material"),
        geometries,
        textures,
        texture_slots: texture_slots(&document),
    })
}

/// Name part of an object's `name\0\x01Class` property.
fn object_name(node: &Node) -> Option<&str> {
    node.properties
        .get(1)
        .and_then(Property::as_str)
        .and_then(|s| s.split('\0').next())
}

fn texture_slots(document: &Document) -> Vec<String> {
    let Some(connections) = document.find("Connections") else {
        return Vec::new();
    };
    connections
        .find_all("C")
        .filter(|c| c.properties.first().and_then(Property::as_str) == Some("OP"))
        .filter_map(|c| c.properties.get(3).and_then(Property::as_str))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::solid_png;

    #[test]
    fn test_validate_png() {
        let info = validate_png(&solid_png(4, 2, [0, 0, 0, 255])).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        assert_eq!(info.color_type, png::ColorType::Rgba);
    }

    #[test]
    fn test_rgb_pixels() {
        assert_eq!(
            png_rgb_pixels(&solid_png(2, 1, [9, 8, 7, 255])).unwrap(),
            vec![[9, 8, 7], [9, 8, 7]]
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(validate_png(b"nope").unwrap_err().format, "PNG");
        assert_eq!(validate_fbx(b"nope").unwrap_err().format, "FBX");
    }

    #[test]
    fn test_object_name_strips_class() {
        let node = Node::new("Model")
            .prop(1i64)
            .prop(Property::object_name("Cube", "Model"));
        assert_eq!(object_name(&node), Some("Cube"));
    }
}
