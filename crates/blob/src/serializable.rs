//! The serialization contract of blob elements.

use archi_core::ArchiResult;

use crate::reader::MemoryReader;
use crate::writer::BinaryWriter;

/// A blob element that can be written to and read from a binary image.
pub trait Serializable {
    /// The exact number of bytes [`Serializable::serialize`] will emit.
    fn size(&self) -> usize;

    /// Appends the element to the writer.
    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()>;

    /// Reads the element from the reader.
    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self>
    where
        Self: Sized;

    /// Serialises the element into a fresh byte vector.
    fn to_bytes(&self) -> ArchiResult<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Parses an element from a byte slice, requiring full consumption.
    fn from_bytes(data: &[u8]) -> ArchiResult<Self>
    where
        Self: Sized,
    {
        let mut reader = MemoryReader::new(data);
        let element = Self::deserialize(&mut reader)?;
        reader.expect_end()?;
        Ok(element)
    }
}
