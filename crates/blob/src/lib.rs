//! # Archipelago configuration blob format
//!
//! A configuration blob is a little-endian binary image holding a header, a
//! signal watch set, and three declarative arrays: the shared libraries to
//! open, the named interfaces they export, and the configuration script
//! replayed against the context registry. The image is position-independent:
//! the host reads the file into memory and parses it in place.
//!
//! Serialization is explicit and hand-rolled: a bounds-checked
//! [`MemoryReader`], an append-only [`BinaryWriter`], and a [`Serializable`]
//! trait implemented by every blob element. Parsing a well-formed blob and
//! re-serialising it yields a bytewise-equal image.

pub mod blob;
pub mod reader;
pub mod serializable;
pub mod writer;

pub use blob::{ConfigBlob, InterfaceDecl, LibraryDecl, BLOB_MAGIC, BLOB_VERSION};
pub use reader::MemoryReader;
pub use serializable::Serializable;
pub use writer::BinaryWriter;
