//! Binary FBX parser for uncompressed 7.x documents.
//!
//! Only the property encodings the exporter produces are understood, plus
//! the remaining scalar types; compressed arrays are rejected.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use super::node::{Document, Node, Property};
use super::writer::{MAGIC, NULL_RECORD_LEN};

/// Errors from FBX parsing.
#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("Not a binary FBX file")]
    BadMagic,

    #[error("Unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error("Unsupported FBX version {0}")]
    UnsupportedVersion(u32),

    #[error("Unknown property type '{code}' at offset {offset}")]
    UnknownProperty { code: char, offset: usize },

    #[error("Compressed arrays are not supported (offset {0})")]
    CompressedArray(usize),

    #[error("Node record at {offset} ends at {end}, which is out of bounds")]
    BadOffset { offset: usize, end: usize },
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(ReadError::Truncated(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}

/// Parse a binary FBX document.
pub fn from_bytes(data: &[u8]) -> Result<Document, ReadError> {
    if data.len() < MAGIC.len() + 4 || &data[..MAGIC.len()] != MAGIC {
        return Err(ReadError::BadMagic);
    }
    let mut cursor = Cursor {
        data,
        pos: MAGIC.len(),
    };
    let version = cursor.u32()?;
    if !(7000..7500).contains(&version) {
        return Err(ReadError::UnsupportedVersion(version));
    }

    let mut nodes = Vec::new();
    while let Some(node) = read_node(&mut cursor)? {
        nodes.push(node);
    }
    Ok(Document { version, nodes })
}

/// Reads one record; `None` for a null record.
fn read_node(cursor: &mut Cursor<'_>) -> Result<Option<Node>, ReadError> {
    let offset = cursor.pos;
    let end = cursor.u32()? as usize;
    let num_props = cursor.u32()?;
    let _props_len = cursor.u32()?;
    let name_len = cursor.u8()? as usize;

    if end == 0 {
        // Null record: the remaining fields are zero and the name is empty.
        return Ok(None);
    }
    if end > cursor.data.len() || end < offset + NULL_RECORD_LEN {
        return Err(ReadError::BadOffset { offset, end });
    }

    let name = String::from_utf8_lossy(cursor.take(name_len)?).into_owned();
    let mut node = Node::new(name);
    for _ in 0..num_props {
        node.properties.push(read_property(cursor)?);
    }
    while cursor.pos < end {
        match read_node(cursor)? {
            Some(child) => node.children.push(child),
            None => break,
        }
    }
    cursor.pos = end;
    Ok(Some(node))
}

fn read_property(cursor: &mut Cursor<'_>) -> Result<Property, ReadError> {
    let offset = cursor.pos;
    let code = cursor.u8()?;
    let property = match code {
        b'C' => Property::Bool(cursor.u8()? != 0),
        b'Y' => Property::I32(LittleEndian::read_i16(cursor.take(2)?) as i32),
        b'I' => Property::I32(LittleEndian::read_i32(cursor.take(4)?)),
        b'L' => Property::I64(LittleEndian::read_i64(cursor.take(8)?)),
        b'F' => Property::F64(LittleEndian::read_f32(cursor.take(4)?) as f64),
        b'D' => Property::F64(LittleEndian::read_f64(cursor.take(8)?)),
        b'S' => {
            let len = cursor.u32()? as usize;
            Property::String(String::from_utf8_lossy(cursor.take(len)?).into_owned())
        }
        b'R' => {
            let len = cursor.u32()? as usize;
            Property::Raw(cursor.take(len)?.to_vec())
        }
        b'i' => {
            let bytes = read_array(cursor, 4, offset)?;
            Property::I32Array(bytes.chunks_exact(4).map(LittleEndian::read_i32).collect())
        }
        b'd' => {
            let bytes = read_array(cursor, 8, offset)?;
            Property::F64Array(bytes.chunks_exact(8).map(LittleEndian::read_f64).collect())
        }
        other => {
            return Err(ReadError::UnknownProperty {
                code: other as char,
                offset,
            })
        }
    };
    Ok(property)
}

fn read_array<'a>(
    cursor: &mut Cursor<'a>,
    element_size: usize,
    offset: usize,
) -> Result<&'a [u8], ReadError> {
    let count = cursor.u32()? as usize;
    let encoding = cursor.u32()?;
    let byte_len = cursor.u32()? as usize;
    if encoding != 0 {
        return Err(ReadError::CompressedArray(offset));
    }
    if count.checked_mul(element_size) != Some(byte_len) {
        return Err(ReadError::Truncated(offset));
    }
    cursor.take(byte_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fbx::writer::{to_bytes, VERSION};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_written_tree() {
        let doc = Document {
            version: VERSION,
            nodes: vec![
                Node::new("Objects").child(
                    Node::new("Geometry")
                        .prop(42i64)
                        .prop(Property::object_name("Cube", "Geometry"))
                        .prop("Mesh")
                        .child(Node::leaf("Vertices", Property::F64Array(vec![0.0, 1.0, 2.0])))
                        .child(Node::leaf("PolygonVertexIndex", Property::I32Array(vec![0, 1, -3]))),
                ),
                Node::new("References"),
                Node::new("Video").child(Node::leaf("Content", Property::Raw(vec![1, 2, 3]))),
            ],
        };
        let parsed = from_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(from_bytes(b"glTF"), Err(ReadError::BadMagic));
        let mut bytes = to_bytes(&Document {
            version: VERSION,
            nodes: vec![Node::leaf("A", 1i32)],
        })
        .unwrap();
        bytes.truncate(35);
        assert_eq!(from_bytes(&bytes), Err(ReadError::Truncated(35)));
    }
}
