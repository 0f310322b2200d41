//! Binary FBX 7.4 support.
//!
//! - [`node`]: the in-memory node tree
//! - [`writer`]: serialization to the binary record format
//! - [`reader`]: parsing of uncompressed binary documents
//! - [`FbxExporter`]: scene export with embedded textures

mod export;
pub mod node;
pub mod reader;
pub mod writer;

pub use export::{FbxExporter, TEXTURE_SLOTS};
pub use node::{Document, Node, Property};
pub use reader::{from_bytes, ReadError};
pub use writer::to_bytes;
