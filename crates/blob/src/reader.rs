//! Bounds-checked cursor over an in-memory blob image.

use archi_core::{ArchiError, ArchiResult};

/// A reader over borrowed memory. Every read is bounds-checked; running off
/// the end is a format error, never a panic.
pub struct MemoryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total image length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the image is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> ArchiResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(ArchiError::format(format!(
                "unexpected end of data: {count} bytes needed at offset {}, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> ArchiResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean encoded as a single `0`/`1` byte.
    pub fn read_bool(&mut self) -> ArchiResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ArchiError::format(format!(
                "invalid boolean byte {other:#04x}"
            ))),
        }
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> ArchiResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> ArchiResult<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice length checked");
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> ArchiResult<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice length checked");
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> ArchiResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> ArchiResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a little-endian `f64`.
    pub fn read_f64(&mut self) -> ArchiResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a variable-length unsigned integer.
    pub fn read_var_int(&mut self) -> ArchiResult<u64> {
        match self.read_u8()? {
            prefix @ 0..=0xFC => Ok(u64::from(prefix)),
            0xFD => Ok(u64::from(self.read_u16()?)),
            0xFE => Ok(u64::from(self.read_u32()?)),
            0xFF => self.read_u64(),
        }
    }

    /// Reads a var-int length capped by `max`, guarding against hostile
    /// length prefixes.
    pub fn read_var_len(&mut self, max: usize) -> ArchiResult<usize> {
        let length = self.read_var_int()?;
        if length > max as u64 {
            return Err(ArchiError::format(format!(
                "length prefix {length} exceeds the limit of {max}"
            )));
        }
        Ok(length as usize)
    }

    /// Reads a var-int length-prefixed byte string.
    pub fn read_var_bytes(&mut self) -> ArchiResult<Vec<u8>> {
        let length = self.read_var_len(self.remaining())?;
        Ok(self.take(length)?.to_vec())
    }

    /// Reads a var-int length-prefixed UTF-8 string.
    pub fn read_var_string(&mut self) -> ArchiResult<String> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes)
            .map_err(|_| ArchiError::format("string payload is not valid UTF-8"))
    }

    /// Fails unless the whole image has been consumed.
    pub fn expect_end(&self) -> ArchiResult<()> {
        if self.remaining() != 0 {
            return Err(ArchiError::format(format!(
                "{} trailing bytes after the blob payload",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_primitives() {
        let data = [0x2A, 0x01, 0xD2, 0x04, 0x00, 0x00];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x2A);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_u32().unwrap(), 1234);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.expect_end().is_ok());
    }

    #[test]
    fn var_int_tiers() {
        let data = [
            0x07, // 7
            0xFD, 0x00, 0x01, // 256
            0xFE, 0x00, 0x00, 0x01, 0x00, // 65536
            0xFF, 0, 0, 0, 0, 1, 0, 0, 0, // 2^32
        ];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_var_int().unwrap(), 7);
        assert_eq!(reader.read_var_int().unwrap(), 256);
        assert_eq!(reader.read_var_int().unwrap(), 65536);
        assert_eq!(reader.read_var_int().unwrap(), 1 << 32);
    }

    #[test]
    fn truncated_reads_are_format_errors() {
        let mut reader = MemoryReader::new(&[0x01]);
        assert!(reader.read_u32().is_err());

        // A length prefix larger than the remaining payload is rejected
        // before any allocation happens.
        let mut reader = MemoryReader::new(&[0xFD, 0xFF, 0xFF, 0x61]);
        assert!(reader.read_var_bytes().is_err());
    }

    #[test]
    fn invalid_boolean() {
        let mut reader = MemoryReader::new(&[0x02]);
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn invalid_utf8() {
        let mut reader = MemoryReader::new(&[0x02, 0xFF, 0xFE]);
        assert!(reader.read_var_string().is_err());
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let reader = MemoryReader::new(&[0x00]);
        assert!(reader.expect_end().is_err());
    }
}
