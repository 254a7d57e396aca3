//! Little-endian byte reading for PM2 decoding
//!
//! Multi-value reads are atomic: the remaining length is checked once up
//! front, so a read either returns every requested value or fails with
//! [`Pm2Error::TruncatedInput`] without consuming anything.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Pm2Error, Result};

/// Trait for reading little-endian scalars from a byte source
pub trait ByteReader {
    /// Current offset from the start of the data
    fn position(&self) -> usize;

    /// Number of unread bytes
    fn remaining(&self) -> usize;

    /// Consume `n` bytes and return them
    fn take(&mut self, n: usize) -> Result<&[u8]>;

    /// Advance the cursor by `n` bytes
    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.take(2).map(LittleEndian::read_i16)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.take(4).map(LittleEndian::read_f32)
    }

    /// Read `count` u32 values
    fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>> {
        let bytes = self.take(array_len(count, 4))?;
        let mut values = vec![0; count];
        LittleEndian::read_u32_into(bytes, &mut values);
        Ok(values)
    }

    /// Read `count` i16 values
    fn read_i16_array(&mut self, count: usize) -> Result<Vec<i16>> {
        let bytes = self.take(array_len(count, 2))?;
        let mut values = vec![0; count];
        LittleEndian::read_i16_into(bytes, &mut values);
        Ok(values)
    }

    /// Read `count` i32 values
    fn read_i32_array(&mut self, count: usize) -> Result<Vec<i32>> {
        let bytes = self.take(array_len(count, 4))?;
        let mut values = vec![0; count];
        LittleEndian::read_i32_into(bytes, &mut values);
        Ok(values)
    }

    /// Read `count` f32 values
    fn read_f32_array(&mut self, count: usize) -> Result<Vec<f32>> {
        let bytes = self.take(array_len(count, 4))?;
        let mut values = vec![0.0; count];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(values)
    }
}

// Saturate instead of overflowing so that absurd counts surface as truncation.
fn array_len(count: usize, width: usize) -> usize {
    count.saturating_mul(width)
}

/// A cursor over an in-memory byte slice
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the beginning of the data
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Move the cursor to an absolute offset
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Pm2Error::TruncatedInput {
                offset: self.position,
                requested: position - self.position.min(position),
                remaining: self.remaining(),
            });
        }
        self.position = position;
        Ok(())
    }

    /// The whole underlying slice
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }
}

impl ByteReader for Cursor<'_> {
    fn position(&self) -> usize {
        self.position
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Pm2Error::TruncatedInput {
                offset: self.position,
                requested: n,
                remaining,
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.data[start..self.position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reads_are_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0x00, 0x00, 0x80, 0x3F];
        let mut cursor = Cursor::new(&data);

        assert_eq!(cursor.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(cursor.read_i16().unwrap(), -1);
        assert!((cursor.read_f32().unwrap() - 1.0).abs() < f32::EPSILON);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_array_read_is_atomic() {
        let data = [0u8; 10];
        let mut cursor = Cursor::new(&data);

        let err = cursor.read_u32_array(3).unwrap_err();
        assert!(matches!(
            err,
            Pm2Error::TruncatedInput {
                offset: 0,
                requested: 12,
                remaining: 10
            }
        ));
        // Nothing consumed by the failed read
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_i16_array(5).unwrap(), vec![0; 5]);
    }

    #[test]
    fn test_huge_count_is_truncation_not_overflow() {
        let mut cursor = Cursor::new(&[0u8; 4]);
        assert!(matches!(
            cursor.read_f32_array(usize::MAX),
            Err(Pm2Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_seek_bounds() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(&data);
        cursor.seek(2).unwrap();
        assert_eq!(cursor.read_u8().unwrap(), 3);
        assert!(cursor.seek(4).is_err());
    }
}
