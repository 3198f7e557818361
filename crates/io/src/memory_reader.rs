use crate::{IoError, IoResult};
use byteorder::{ByteOrder, LittleEndian};
use std::mem::size_of;

/// Forward-only reader over a borrowed byte buffer.
///
/// The reader never reads past the end of its buffer and never allocates more
/// than the number of bytes a call asks for; every read first checks that the
/// requested bytes are present.
pub struct MemoryReader<'a> {
    memory: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    pub fn new(memory: &'a [u8]) -> Self {
        Self { memory, pos: 0 }
    }

    /// Creates a reader positioned at `pos`.
    pub fn with_position(memory: &'a [u8], pos: usize) -> IoResult<Self> {
        if pos > memory.len() {
            return Err(IoError::UnexpectedEof {
                offset: pos,
                needed: 0,
                available: 0,
            });
        }
        Ok(Self { memory, pos })
    }

    #[inline(always)]
    fn ensure_position(&self, move_by: usize) -> IoResult<()> {
        let available = self.remaining();
        if move_by > available {
            Err(IoError::UnexpectedEof {
                offset: self.pos,
                needed: move_by,
                available,
            })
        } else {
            Ok(())
        }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.memory.len().saturating_sub(self.pos)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline(always)]
    pub fn peek(&self) -> IoResult<u8> {
        self.ensure_position(1)?;
        Ok(self.memory[self.pos])
    }

    pub fn read_bool(&mut self) -> IoResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IoError::invalid_data(format!(
                "invalid boolean value {other:#04x}"
            ))),
        }
    }

    #[inline(always)]
    pub fn read_i8(&mut self) -> IoResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> IoResult<u8> {
        self.ensure_position(1)?;
        let value = self.memory[self.pos];
        self.pos += 1;
        Ok(value)
    }

    #[inline(always)]
    pub fn read_i16(&mut self) -> IoResult<i16> {
        self.ensure_position(size_of::<i16>())?;
        let value = LittleEndian::read_i16(&self.memory[self.pos..]);
        self.pos += size_of::<i16>();
        Ok(value)
    }

    #[inline(always)]
    pub fn read_u16(&mut self) -> IoResult<u16> {
        self.ensure_position(size_of::<u16>())?;
        let value = LittleEndian::read_u16(&self.memory[self.pos..]);
        self.pos += size_of::<u16>();
        Ok(value)
    }

    #[inline(always)]
    pub fn read_i32(&mut self) -> IoResult<i32> {
        self.ensure_position(size_of::<i32>())?;
        let value = LittleEndian::read_i32(&self.memory[self.pos..]);
        self.pos += size_of::<i32>();
        Ok(value)
    }

    #[inline(always)]
    pub fn read_u32(&mut self) -> IoResult<u32> {
        self.ensure_position(size_of::<u32>())?;
        let value = LittleEndian::read_u32(&self.memory[self.pos..]);
        self.pos += size_of::<u32>();
        Ok(value)
    }

    #[inline(always)]
    pub fn read_i64(&mut self) -> IoResult<i64> {
        self.ensure_position(size_of::<i64>())?;
        let value = LittleEndian::read_i64(&self.memory[self.pos..]);
        self.pos += size_of::<i64>();
        Ok(value)
    }

    #[inline(always)]
    pub fn read_u64(&mut self) -> IoResult<u64> {
        self.ensure_position(size_of::<u64>())?;
        let value = LittleEndian::read_u64(&self.memory[self.pos..]);
        self.pos += size_of::<u64>();
        Ok(value)
    }

    /// Reads a variable-length integer (1, 3, 5 or 9 bytes) bounded by `max`.
    pub fn read_var_int(&mut self, max: u64) -> IoResult<u64> {
        let b = self.read_u8()?;
        let value = match b {
            0xfd => self.read_u16()? as u64,
            0xfe => self.read_u32()? as u64,
            0xff => self.read_u64()?,
            _ => b as u64,
        };
        if value > max {
            return Err(IoError::ExceedsMaximum { value, max });
        }
        Ok(value)
    }

    pub fn read_var_string(&mut self, max: usize) -> IoResult<String> {
        let data = self.read_var_memory(max)?;
        String::from_utf8(data.to_vec()).map_err(|_| IoError::invalid_data("invalid UTF-8 sequence"))
    }

    #[inline(always)]
    pub fn read_memory(&mut self, count: usize) -> IoResult<&'a [u8]> {
        self.ensure_position(count)?;
        let result = &self.memory[self.pos..self.pos + count];
        self.pos += count;
        Ok(result)
    }

    pub fn read_var_memory(&mut self, max: usize) -> IoResult<&'a [u8]> {
        let length = self.read_var_int(max as u64)? as usize;
        self.read_memory(length)
    }

    pub fn read_var_bytes(&mut self, max: usize) -> IoResult<Vec<u8>> {
        Ok(self.read_var_memory(max)?.to_vec())
    }

    pub fn read_to_end(&mut self) -> &'a [u8] {
        let result = &self.memory[self.pos..];
        self.pos = self.memory.len();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_past_end_does_not_move() {
        let data = [0x01, 0x02];
        let mut reader = MemoryReader::new(&data);
        reader.read_u8().unwrap();
        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            IoError::UnexpectedEof {
                offset: 1,
                needed: 4,
                available: 1
            }
        );
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_var_int_bound() {
        let data = [0xfd, 0x00, 0x01];
        let mut reader = MemoryReader::new(&data);
        assert!(matches!(
            reader.read_var_int(255),
            Err(IoError::ExceedsMaximum { value: 256, max: 255 })
        ));
    }

    #[test]
    fn test_read_bool_rejects_other_values() {
        let data = [0x02];
        let mut reader = MemoryReader::new(&data);
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn test_with_position() {
        let data = [0x00, 0xAA];
        let mut reader = MemoryReader::with_position(&data, 1).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
        assert!(MemoryReader::with_position(&data, 3).is_err());
    }
}
