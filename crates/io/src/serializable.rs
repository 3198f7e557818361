//! Fixed binary encodings for VM values.

use crate::{BinaryWriter, IoResult, MemoryReader};

/// A value with exactly one binary encoding.
pub trait Serializable: Sized {
    /// Encoded length in bytes.
    fn size(&self) -> usize;

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()>;

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self>;
}

/// Whole-buffer conversions for any [`Serializable`].
pub trait SerializableExt: Serializable {
    fn to_array(&self) -> IoResult<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Decodes `data`, rejecting trailing bytes.
    fn from_array(data: &[u8]) -> IoResult<Self> {
        let mut reader = MemoryReader::new(data);
        let value = Self::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(crate::IoError::invalid_data(format!(
                "{} trailing bytes",
                reader.remaining()
            )));
        }
        Ok(value)
    }
}

impl<T: Serializable> SerializableExt for T {}

/// Size arithmetic matching [`BinaryWriter::write_var_int`].
pub mod helper {
    /// Bytes taken by the var-int encoding of `value`.
    pub fn get_var_size(value: u64) -> usize {
        match value {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x1_0000..=0xFFFF_FFFF => 5,
            _ => 9,
        }
    }

    /// Bytes taken by a length-prefixed payload.
    pub fn get_var_bytes_size(value: &[u8]) -> usize {
        get_var_size(value.len() as u64) + value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tagged {
        tag: u8,
        payload: Vec<u8>,
    }

    impl Serializable for Tagged {
        fn size(&self) -> usize {
            1 + helper::get_var_bytes_size(&self.payload)
        }

        fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
            writer.write_u8(self.tag);
            writer.write_var_bytes(&self.payload);
            Ok(())
        }

        fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
            Ok(Self {
                tag: reader.read_u8()?,
                payload: reader.read_var_bytes(1024)?,
            })
        }
    }

    #[test]
    fn test_to_array_matches_size() {
        let value = Tagged {
            tag: 0x28,
            payload: vec![1, 2, 3],
        };
        let bytes = value.to_array().unwrap();
        assert_eq!(bytes, vec![0x28, 3, 1, 2, 3]);
        assert_eq!(bytes.len(), value.size());
        assert_eq!(Tagged::from_array(&bytes).unwrap(), value);
    }

    #[test]
    fn test_from_array_rejects_trailing_bytes() {
        assert!(Tagged::from_array(&[0x28, 0, 0xFF]).is_err());
        assert!(Tagged::from_array(&[0x28]).is_err());
    }

    #[test]
    fn test_get_var_size() {
        assert_eq!(helper::get_var_size(0), 1);
        assert_eq!(helper::get_var_size(252), 1);
        assert_eq!(helper::get_var_size(253), 3);
        assert_eq!(helper::get_var_size(u16::MAX as u64), 3);
        assert_eq!(helper::get_var_size(65536), 5);
        assert_eq!(helper::get_var_size(0xFFFF_FFFF), 5);
        assert_eq!(helper::get_var_size(0x1_0000_0000), 9);
    }
}
