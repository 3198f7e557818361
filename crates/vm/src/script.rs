//! Scripts and their hash identity.

use crate::crypto;
use crate::error::VmResult;
use crate::instruction::Instruction;
use neo2_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The 20-byte identity of a script: RIPEMD-160 over SHA-256 of its bytes.
#[derive(Default, Hash, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub struct ScriptHash(pub [u8; ScriptHash::LENGTH]);

impl ScriptHash {
    pub const LENGTH: usize = 20;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// The all-zero hash, used by call opcodes to request a dynamic target.
    pub const fn zero() -> Self {
        Self([0u8; Self::LENGTH])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Hashes raw script bytes.
    pub fn of(script: &[u8]) -> Self {
        Self(crypto::hash160(script))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ScriptHashParseError> {
        let array: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| ScriptHashParseError::Length(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for ScriptHash {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ScriptHash::LENGTH]> for ScriptHash {
    #[inline]
    fn from(value: [u8; ScriptHash::LENGTH]) -> Self {
        Self(value)
    }
}

impl Serializable for ScriptHash {
    fn size(&self) -> usize {
        Self::LENGTH
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0);
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let mut bytes = [0u8; Self::LENGTH];
        bytes.copy_from_slice(reader.read_memory(Self::LENGTH)?);
        Ok(Self(bytes))
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptHash({self})")
    }
}

/// Failure to parse a [`ScriptHash`] from text or bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptHashParseError {
    #[error("script hash must be 20 bytes, got {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(String),
}

impl FromStr for ScriptHash {
    type Err = ScriptHashParseError;

    /// Parses plain hex in byte order; a leading `0x` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ScriptHashParseError::Hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// Immutable script bytes shared between contexts and script tables.
///
/// Cloning a `Script` shares the underlying buffer; the hash is computed on
/// first use and cached.
#[derive(Clone)]
pub struct Script {
    bytes: Arc<[u8]>,
    hash: OnceCell<ScriptHash>,
}

impl Script {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            hash: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> ScriptHash {
        *self.hash.get_or_init(|| ScriptHash::of(&self.bytes))
    }

    /// Decodes the instruction at `ip`.
    pub fn get_instruction(&self, ip: usize) -> VmResult<Instruction> {
        Instruction::decode(&self.bytes, ip)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("hash", &self.hash())
            .field("len", &self.len())
            .finish()
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Script {}

impl From<Vec<u8>> for Script {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for Script {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_hash_of_empty_script() {
        // RIPEMD160(SHA256("")).
        assert_eq!(
            ScriptHash::of(&[]).to_string(),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let hash = ScriptHash::of(&[0x51, 0x66]);
        let parsed: ScriptHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);

        let prefixed: ScriptHash = format!("0x{hash}").parse().unwrap();
        assert_eq!(prefixed, hash);

        assert_eq!(
            "abcd".parse::<ScriptHash>(),
            Err(ScriptHashParseError::Length(2))
        );
    }

    #[test]
    fn test_binary_form_is_raw_bytes() {
        use neo2_io::SerializableExt;

        let hash = ScriptHash::of(&[0x51]);
        let bytes = hash.to_array().unwrap();
        assert_eq!(bytes, hash.to_vec());
        assert_eq!(ScriptHash::from_array(&bytes).unwrap(), hash);
        assert!(ScriptHash::from_array(&bytes[..19]).is_err());
    }

    #[test]
    fn test_zero_hash() {
        assert!(ScriptHash::zero().is_zero());
        assert!(!ScriptHash::of(&[0x51]).is_zero());
    }

    #[test]
    fn test_script_shares_bytes() {
        let script = Script::from(vec![0x51, 0x52, 0x93]);
        let clone = script.clone();
        assert_eq!(script.as_bytes().as_ptr(), clone.as_bytes().as_ptr());
        assert_eq!(script.hash(), clone.hash());
        assert_eq!(script.get_instruction(2).unwrap().opcode, crate::OpCode::ADD);
    }
}
