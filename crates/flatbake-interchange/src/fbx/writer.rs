//! Binary FBX serializer.
//!
//! Layout of one node record (FBX 7.4, 32-bit offsets):
//!
//! ```text
//! u32 end_offset      absolute file offset just past this record
//! u32 num_properties
//! u32 property_list_len
//! u8  name_len
//! [u8] name
//! properties...
//! children...
//! [13 zero bytes]     null record closing the child list
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use super::node::{Document, Node, Property};

/// File magic, including the two trailing bytes every reader expects.
pub const MAGIC: &[u8; 23] = b"Kaydara FBX Binary  \x00\x1a\x00";

/// Version written by this serializer.
pub const VERSION: u32 = 7400;

/// Size of the null record that terminates a child list.
pub const NULL_RECORD_LEN: usize = 13;

const FOOTER_ID: [u8; 16] = [
    0xfa, 0xbc, 0xab, 0x09, 0xd0, 0xc8, 0xd4, 0x66, 0xb1, 0x76, 0xfb, 0x83, 0x1c, 0xf7, 0x26, 0x7e,
];

const FOOTER_MAGIC: [u8; 16] = [
    0xf8, 0x5a, 0x8c, 0x6a, 0xde, 0xf5, 0xd9, 0x7e, 0xec, 0xe9, 0x0c, 0xe3, 0x75, 0x8f, 0x29, 0x0b,
];

/// Serialize a document to bytes.
pub fn to_bytes(document: &Document) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.write_all(MAGIC)?;
    buf.write_u32::<LittleEndian>(document.version)?;
    for node in &document.nodes {
        write_node(&mut buf, node)?;
    }
    buf.write_all(&[0u8; NULL_RECORD_LEN])?;
    write_footer(&mut buf, document.version)?;
    Ok(buf)
}

fn write_node(buf: &mut Vec<u8>, node: &Node) -> io::Result<()> {
    let name = node.name.as_bytes();
    let name_len = u8::try_from(name.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "FBX node name too long"))?;

    let start = buf.len();
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u32::<LittleEndian>(len_u32(node.properties.len())?)?;
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u8(name_len)?;
    buf.write_all(name)?;

    let props_start = buf.len();
    for property in &node.properties {
        write_property(buf, property)?;
    }
    let props_len = len_u32(buf.len() - props_start)?;

    for child in &node.children {
        write_node(buf, child)?;
    }
    if !node.children.is_empty() || node.properties.is_empty() {
        buf.write_all(&[0u8; NULL_RECORD_LEN])?;
    }

    let end = len_u32(buf.len())?;
    LittleEndian::write_u32(&mut buf[start..start + 4], end);
    LittleEndian::write_u32(&mut buf[start + 8..start + 12], props_len);
    Ok(())
}

fn write_property(buf: &mut Vec<u8>, property: &Property) -> io::Result<()> {
    buf.write_u8(property.type_code())?;
    match property {
        Property::Bool(v) => buf.write_u8(u8::from(*v))?,
        Property::I32(v) => buf.write_i32::<LittleEndian>(*v)?,
        Property::I64(v) => buf.write_i64::<LittleEndian>(*v)?,
        Property::F64(v) => buf.write_f64::<LittleEndian>(*v)?,
        Property::String(s) => {
            buf.write_u32::<LittleEndian>(len_u32(s.len())?)?;
            buf.write_all(s.as_bytes())?;
        }
        Property::Raw(bytes) => {
            buf.write_u32::<LittleEndian>(len_u32(bytes.len())?)?;
            buf.write_all(bytes)?;
        }
        Property::I32Array(values) => {
            write_array_header(buf, values.len(), 4)?;
            for v in values {
                buf.write_i32::<LittleEndian>(*v)?;
            }
        }
        Property::F64Array(values) => {
            write_array_header(buf, values.len(), 8)?;
            for v in values {
                buf.write_f64::<LittleEndian>(*v)?;
            }
        }
    }
    Ok(())
}

/// Array header: element count, encoding (0 = uncompressed), byte length.
fn write_array_header(buf: &mut Vec<u8>, count: usize, element_size: usize) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(len_u32(count)?)?;
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u32::<LittleEndian>(len_u32(count * element_size)?)?;
    Ok(())
}

fn write_footer(buf: &mut Vec<u8>, version: u32) -> io::Result<()> {
    buf.write_all(&FOOTER_ID)?;
    let pad = match buf.len() % 16 {
        0 => 16,
        r => 16 - r,
    };
    buf.write_all(&vec![0u8; pad])?;
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u32::<LittleEndian>(version)?;
    buf.write_all(&[0u8; 120])?;
    buf.write_all(&FOOTER_MAGIC)?;
    Ok(())
}

fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "FBX 7.4 offsets are limited to 4 GiB",
        )
    })
}
