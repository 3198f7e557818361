//! Instruction module for the virtual machine.
//!
//! This module provides instruction representation and decoding.

use crate::error::{VmError, VmResult};
use crate::op_code::{OpCode, OperandSize, PrefixWidth};
use crate::script::ScriptHash;
use neo2_io::{IoError, MemoryReader, Serializable};

/// Represents a decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The position of the instruction in the script
    pub pointer: usize,

    /// The opcode of the instruction
    pub opcode: OpCode,

    /// The operand data, without any length prefix
    pub operand: Vec<u8>,

    /// Total encoded length: opcode, prefix and operand
    pub size: usize,
}

impl Instruction {
    /// Decodes the instruction starting at `position`.
    ///
    /// A position at or past the end of the script decodes to an implicit
    /// [`OpCode::RET`] of size one, so running off the end of a script
    /// returns from it.
    pub fn decode(script: &[u8], position: usize) -> VmResult<Self> {
        if position >= script.len() {
            return Ok(Self::ret(position));
        }

        let mut reader = MemoryReader::with_position(script, position)?;
        let byte = reader.read_u8().map_err(|e| truncated(position, e))?;
        let opcode = OpCode::from_byte(byte).ok_or(VmError::InvalidOpcode {
            opcode: byte,
            position,
        })?;

        let length = match opcode.operand_size() {
            OperandSize::Fixed(size) => size,
            OperandSize::Prefix(width) => read_prefix(&mut reader, width, position)?,
            OperandSize::ShortString => {
                let length = reader.read_u8().map_err(|e| truncated(position, e))?;
                if length >= OperandSize::SHORT_STRING_LIMIT {
                    return Err(VmError::InvalidPayloadLength {
                        position,
                        length: length as i64,
                    });
                }
                length as usize
            }
        };

        // Bounds are checked by the reader before anything is copied.
        let operand = reader
            .read_memory(length)
            .map_err(|e| truncated(position, e))?
            .to_vec();

        Ok(Self {
            pointer: position,
            opcode,
            operand,
            size: reader.position() - position,
        })
    }

    /// Creates a new instruction with the given opcode and operand.
    /// This is primarily used for testing.
    pub fn new(opcode: OpCode, operand: &[u8]) -> Self {
        let prefix = opcode.operand_size().size_prefix();
        Self {
            pointer: 0,
            opcode,
            operand: operand.to_vec(),
            size: 1 + prefix + operand.len(),
        }
    }

    /// The implicit return executed when the pointer reaches the end of a script.
    pub fn ret(pointer: usize) -> Self {
        Self {
            pointer,
            opcode: OpCode::RET,
            operand: Vec::new(),
            size: 1,
        }
    }

    /// Returns the opcode of the instruction.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Returns the position of the instruction in the script.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Returns the operand data.
    pub fn operand(&self) -> &[u8] {
        &self.operand
    }

    /// Returns the size of the instruction in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Position of the instruction that follows this one.
    pub fn next_pointer(&self) -> usize {
        self.pointer + self.size
    }

    /// Reads the unsigned byte at `offset` within the operand.
    pub fn token_u8(&self, offset: usize) -> u8 {
        self.operand.get(offset).copied().unwrap_or(0)
    }

    /// Reads a little-endian i16 at `offset` within the operand.
    pub fn token_i16(&self, offset: usize) -> i16 {
        i16::from_le_bytes([self.token_u8(offset), self.token_u8(offset + 1)])
    }

    /// Reads a 20-byte script hash at `offset` within the operand.
    pub fn token_hash(&self, offset: usize) -> VmResult<ScriptHash> {
        MemoryReader::with_position(&self.operand, offset)
            .and_then(|mut reader| ScriptHash::deserialize(&mut reader))
            .map_err(|_| {
                VmError::invalid_operation(format!(
                    "{} operand too short for a script hash",
                    self.opcode
                ))
            })
    }

    /// Interprets the operand as text, used for SYSCALL names.
    pub fn token_string(&self) -> String {
        String::from_utf8_lossy(&self.operand).into_owned()
    }
}

fn read_prefix(reader: &mut MemoryReader, width: PrefixWidth, position: usize) -> VmResult<usize> {
    let read = |e| truncated(position, e);
    let length: i64 = match width {
        PrefixWidth::U8 => reader.read_u8().map_err(read)? as i64,
        PrefixWidth::I16 => reader.read_i16().map_err(read)? as i64,
        PrefixWidth::U16 => reader.read_u16().map_err(read)? as i64,
        PrefixWidth::I32 => reader.read_i32().map_err(read)? as i64,
        PrefixWidth::U32 => reader.read_u32().map_err(read)? as i64,
    };
    if length < 0 {
        return Err(VmError::InvalidPayloadLength { position, length });
    }
    Ok(length as usize)
}

fn truncated(position: usize, error: IoError) -> VmError {
    match error {
        IoError::UnexpectedEof {
            needed, available, ..
        } => VmError::TruncatedScript {
            position,
            needed: needed.saturating_sub(available),
        },
        other => other.into(),
    }
}
