//! OpCode module for the legacy Neo virtual machine.
//!
//! The byte values below are a fixed, versioned table: encoders and decoders on
//! every node must agree on them bit for bit.

pub mod operand_size;

pub use operand_size::{OperandSize, PrefixWidth};

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// An opcode of the virtual machine.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpCode {
    /// An empty array of bytes is pushed onto the stack.
    PUSH0 = 0x00,
    PUSHBYTES1 = 0x01,
    PUSHBYTES2 = 0x02,
    PUSHBYTES3 = 0x03,
    PUSHBYTES4 = 0x04,
    PUSHBYTES5 = 0x05,
    PUSHBYTES6 = 0x06,
    PUSHBYTES7 = 0x07,
    PUSHBYTES8 = 0x08,
    PUSHBYTES9 = 0x09,
    PUSHBYTES10 = 0x0A,
    PUSHBYTES11 = 0x0B,
    PUSHBYTES12 = 0x0C,
    PUSHBYTES13 = 0x0D,
    PUSHBYTES14 = 0x0E,
    PUSHBYTES15 = 0x0F,
    PUSHBYTES16 = 0x10,
    PUSHBYTES17 = 0x11,
    PUSHBYTES18 = 0x12,
    PUSHBYTES19 = 0x13,
    PUSHBYTES20 = 0x14,
    PUSHBYTES21 = 0x15,
    PUSHBYTES22 = 0x16,
    PUSHBYTES23 = 0x17,
    PUSHBYTES24 = 0x18,
    PUSHBYTES25 = 0x19,
    PUSHBYTES26 = 0x1A,
    PUSHBYTES27 = 0x1B,
    PUSHBYTES28 = 0x1C,
    PUSHBYTES29 = 0x1D,
    PUSHBYTES30 = 0x1E,
    PUSHBYTES31 = 0x1F,
    PUSHBYTES32 = 0x20,
    PUSHBYTES33 = 0x21,
    PUSHBYTES34 = 0x22,
    PUSHBYTES35 = 0x23,
    PUSHBYTES36 = 0x24,
    PUSHBYTES37 = 0x25,
    PUSHBYTES38 = 0x26,
    PUSHBYTES39 = 0x27,
    PUSHBYTES40 = 0x28,
    PUSHBYTES41 = 0x29,
    PUSHBYTES42 = 0x2A,
    PUSHBYTES43 = 0x2B,
    PUSHBYTES44 = 0x2C,
    PUSHBYTES45 = 0x2D,
    PUSHBYTES46 = 0x2E,
    PUSHBYTES47 = 0x2F,
    PUSHBYTES48 = 0x30,
    PUSHBYTES49 = 0x31,
    PUSHBYTES50 = 0x32,
    PUSHBYTES51 = 0x33,
    PUSHBYTES52 = 0x34,
    PUSHBYTES53 = 0x35,
    PUSHBYTES54 = 0x36,
    PUSHBYTES55 = 0x37,
    PUSHBYTES56 = 0x38,
    PUSHBYTES57 = 0x39,
    PUSHBYTES58 = 0x3A,
    PUSHBYTES59 = 0x3B,
    PUSHBYTES60 = 0x3C,
    PUSHBYTES61 = 0x3D,
    PUSHBYTES62 = 0x3E,
    PUSHBYTES63 = 0x3F,
    PUSHBYTES64 = 0x40,
    PUSHBYTES65 = 0x41,
    PUSHBYTES66 = 0x42,
    PUSHBYTES67 = 0x43,
    PUSHBYTES68 = 0x44,
    PUSHBYTES69 = 0x45,
    PUSHBYTES70 = 0x46,
    PUSHBYTES71 = 0x47,
    PUSHBYTES72 = 0x48,
    PUSHBYTES73 = 0x49,
    PUSHBYTES74 = 0x4A,
    PUSHBYTES75 = 0x4B,
    /// The next byte contains the number of bytes to be pushed onto the stack.
    PUSHDATA1 = 0x4C,
    /// The next two bytes contain the number of bytes to be pushed onto the stack.
    PUSHDATA2 = 0x4D,
    /// The next four bytes contain the number of bytes to be pushed onto the stack.
    PUSHDATA4 = 0x4E,
    /// The number -1 is pushed onto the stack.
    PUSHM1 = 0x4F,
    PUSH1 = 0x51,
    PUSH2 = 0x52,
    PUSH3 = 0x53,
    PUSH4 = 0x54,
    PUSH5 = 0x55,
    PUSH6 = 0x56,
    PUSH7 = 0x57,
    PUSH8 = 0x58,
    PUSH9 = 0x59,
    PUSH10 = 0x5A,
    PUSH11 = 0x5B,
    PUSH12 = 0x5C,
    PUSH13 = 0x5D,
    PUSH14 = 0x5E,
    PUSH15 = 0x5F,
    PUSH16 = 0x60,
    /// Does nothing.
    NOP = 0x61,
    /// Unconditional jump relative to the opcode position.
    JMP = 0x62,
    /// Jumps when the popped value is true.
    JMPIF = 0x63,
    /// Jumps when the popped value is false.
    JMPIFNOT = 0x64,
    /// Calls a subroutine in the same script.
    CALL = 0x65,
    /// Returns from the current context.
    RET = 0x66,
    /// Calls another script by hash.
    APPCALL = 0x67,
    /// Invokes a named interop service.
    SYSCALL = 0x68,
    /// Calls another script by hash, replacing the current context.
    TAILCALL = 0x69,
    DUPFROMALTSTACK = 0x6A,
    /// Moves the top item to the alt stack.
    TOALTSTACK = 0x6B,
    /// Moves the top alt stack item to the evaluation stack.
    FROMALTSTACK = 0x6C,
    XDROP = 0x6D,
    XSWAP = 0x72,
    XTUCK = 0x73,
    /// Pushes the number of stack items.
    DEPTH = 0x74,
    /// Removes the top stack item.
    DROP = 0x75,
    /// Duplicates the top stack item.
    DUP = 0x76,
    /// Removes the second-to-top stack item.
    NIP = 0x77,
    /// Copies the second-to-top item to the top.
    OVER = 0x78,
    /// Copies the item n back in the stack to the top.
    PICK = 0x79,
    /// Moves the item n back in the stack to the top.
    ROLL = 0x7A,
    /// Moves the third item to the top.
    ROT = 0x7B,
    /// Swaps the top two items.
    SWAP = 0x7C,
    /// Copies the top item below the second-to-top item.
    TUCK = 0x7D,
    /// Concatenates two byte arrays.
    CAT = 0x7E,
    SUBSTR = 0x7F,
    LEFT = 0x80,
    RIGHT = 0x81,
    SIZE = 0x82,
    INVERT = 0x83,
    AND = 0x84,
    OR = 0x85,
    XOR = 0x86,
    /// Pushes true when the two top items are equal.
    EQUAL = 0x87,
    INC = 0x8B,
    DEC = 0x8C,
    SIGN = 0x8D,
    NEGATE = 0x8F,
    ABS = 0x90,
    NOT = 0x91,
    NZ = 0x92,
    ADD = 0x93,
    SUB = 0x94,
    MUL = 0x95,
    DIV = 0x96,
    MOD = 0x97,
    SHL = 0x98,
    SHR = 0x99,
    BOOLAND = 0x9A,
    BOOLOR = 0x9B,
    NUMEQUAL = 0x9C,
    NUMNOTEQUAL = 0x9E,
    LT = 0x9F,
    GT = 0xA0,
    LTE = 0xA1,
    GTE = 0xA2,
    MIN = 0xA3,
    MAX = 0xA4,
    WITHIN = 0xA5,
    SHA1 = 0xA7,
    SHA256 = 0xA8,
    HASH160 = 0xA9,
    HASH256 = 0xAA,
    CHECKSIG = 0xAC,
    VERIFY = 0xAD,
    CHECKMULTISIG = 0xAE,
    ARRAYSIZE = 0xC0,
    PACK = 0xC1,
    UNPACK = 0xC2,
    PICKITEM = 0xC3,
    SETITEM = 0xC4,
    NEWARRAY = 0xC5,
    NEWSTRUCT = 0xC6,
    NEWMAP = 0xC7,
    APPEND = 0xC8,
    REVERSE = 0xC9,
    REMOVE = 0xCA,
    HASKEY = 0xCB,
    KEYS = 0xCC,
    VALUES = 0xCD,
    /// Calls a subroutine with explicit return and parameter counts.
    CALL_I = 0xE0,
    CALL_E = 0xE1,
    CALL_ED = 0xE2,
    CALL_ET = 0xE3,
    CALL_EDT = 0xE4,
    /// Faults the engine.
    THROW = 0xF0,
    /// Faults the engine when the popped value is false.
    THROWIFNOT = 0xF1,
}

/// Every opcode in byte order.
static ALL: &[OpCode] = &[
    OpCode::PUSH0,
    OpCode::PUSHBYTES1,
    OpCode::PUSHBYTES2,
    OpCode::PUSHBYTES3,
    OpCode::PUSHBYTES4,
    OpCode::PUSHBYTES5,
    OpCode::PUSHBYTES6,
    OpCode::PUSHBYTES7,
    OpCode::PUSHBYTES8,
    OpCode::PUSHBYTES9,
    OpCode::PUSHBYTES10,
    OpCode::PUSHBYTES11,
    OpCode::PUSHBYTES12,
    OpCode::PUSHBYTES13,
    OpCode::PUSHBYTES14,
    OpCode::PUSHBYTES15,
    OpCode::PUSHBYTES16,
    OpCode::PUSHBYTES17,
    OpCode::PUSHBYTES18,
    OpCode::PUSHBYTES19,
    OpCode::PUSHBYTES20,
    OpCode::PUSHBYTES21,
    OpCode::PUSHBYTES22,
    OpCode::PUSHBYTES23,
    OpCode::PUSHBYTES24,
    OpCode::PUSHBYTES25,
    OpCode::PUSHBYTES26,
    OpCode::PUSHBYTES27,
    OpCode::PUSHBYTES28,
    OpCode::PUSHBYTES29,
    OpCode::PUSHBYTES30,
    OpCode::PUSHBYTES31,
    OpCode::PUSHBYTES32,
    OpCode::PUSHBYTES33,
    OpCode::PUSHBYTES34,
    OpCode::PUSHBYTES35,
    OpCode::PUSHBYTES36,
    OpCode::PUSHBYTES37,
    OpCode::PUSHBYTES38,
    OpCode::PUSHBYTES39,
    OpCode::PUSHBYTES40,
    OpCode::PUSHBYTES41,
    OpCode::PUSHBYTES42,
    OpCode::PUSHBYTES43,
    OpCode::PUSHBYTES44,
    OpCode::PUSHBYTES45,
    OpCode::PUSHBYTES46,
    OpCode::PUSHBYTES47,
    OpCode::PUSHBYTES48,
    OpCode::PUSHBYTES49,
    OpCode::PUSHBYTES50,
    OpCode::PUSHBYTES51,
    OpCode::PUSHBYTES52,
    OpCode::PUSHBYTES53,
    OpCode::PUSHBYTES54,
    OpCode::PUSHBYTES55,
    OpCode::PUSHBYTES56,
    OpCode::PUSHBYTES57,
    OpCode::PUSHBYTES58,
    OpCode::PUSHBYTES59,
    OpCode::PUSHBYTES60,
    OpCode::PUSHBYTES61,
    OpCode::PUSHBYTES62,
    OpCode::PUSHBYTES63,
    OpCode::PUSHBYTES64,
    OpCode::PUSHBYTES65,
    OpCode::PUSHBYTES66,
    OpCode::PUSHBYTES67,
    OpCode::PUSHBYTES68,
    OpCode::PUSHBYTES69,
    OpCode::PUSHBYTES70,
    OpCode::PUSHBYTES71,
    OpCode::PUSHBYTES72,
    OpCode::PUSHBYTES73,
    OpCode::PUSHBYTES74,
    OpCode::PUSHBYTES75,
    OpCode::PUSHDATA1,
    OpCode::PUSHDATA2,
    OpCode::PUSHDATA4,
    OpCode::PUSHM1,
    OpCode::PUSH1,
    OpCode::PUSH2,
    OpCode::PUSH3,
    OpCode::PUSH4,
    OpCode::PUSH5,
    OpCode::PUSH6,
    OpCode::PUSH7,
    OpCode::PUSH8,
    OpCode::PUSH9,
    OpCode::PUSH10,
    OpCode::PUSH11,
    OpCode::PUSH12,
    OpCode::PUSH13,
    OpCode::PUSH14,
    OpCode::PUSH15,
    OpCode::PUSH16,
    OpCode::NOP,
    OpCode::JMP,
    OpCode::JMPIF,
    OpCode::JMPIFNOT,
    OpCode::CALL,
    OpCode::RET,
    OpCode::APPCALL,
    OpCode::SYSCALL,
    OpCode::TAILCALL,
    OpCode::DUPFROMALTSTACK,
    OpCode::TOALTSTACK,
    OpCode::FROMALTSTACK,
    OpCode::XDROP,
    OpCode::XSWAP,
    OpCode::XTUCK,
    OpCode::DEPTH,
    OpCode::DROP,
    OpCode::DUP,
    OpCode::NIP,
    OpCode::OVER,
    OpCode::PICK,
    OpCode::ROLL,
    OpCode::ROT,
    OpCode::SWAP,
    OpCode::TUCK,
    OpCode::CAT,
    OpCode::SUBSTR,
    OpCode::LEFT,
    OpCode::RIGHT,
    OpCode::SIZE,
    OpCode::INVERT,
    OpCode::AND,
    OpCode::OR,
    OpCode::XOR,
    OpCode::EQUAL,
    OpCode::INC,
    OpCode::DEC,
    OpCode::SIGN,
    OpCode::NEGATE,
    OpCode::ABS,
    OpCode::NOT,
    OpCode::NZ,
    OpCode::ADD,
    OpCode::SUB,
    OpCode::MUL,
    OpCode::DIV,
    OpCode::MOD,
    OpCode::SHL,
    OpCode::SHR,
    OpCode::BOOLAND,
    OpCode::BOOLOR,
    OpCode::NUMEQUAL,
    OpCode::NUMNOTEQUAL,
    OpCode::LT,
    OpCode::GT,
    OpCode::LTE,
    OpCode::GTE,
    OpCode::MIN,
    OpCode::MAX,
    OpCode::WITHIN,
    OpCode::SHA1,
    OpCode::SHA256,
    OpCode::HASH160,
    OpCode::HASH256,
    OpCode::CHECKSIG,
    OpCode::VERIFY,
    OpCode::CHECKMULTISIG,
    OpCode::ARRAYSIZE,
    OpCode::PACK,
    OpCode::UNPACK,
    OpCode::PICKITEM,
    OpCode::SETITEM,
    OpCode::NEWARRAY,
    OpCode::NEWSTRUCT,
    OpCode::NEWMAP,
    OpCode::APPEND,
    OpCode::REVERSE,
    OpCode::REMOVE,
    OpCode::HASKEY,
    OpCode::KEYS,
    OpCode::VALUES,
    OpCode::CALL_I,
    OpCode::CALL_E,
    OpCode::CALL_ED,
    OpCode::CALL_ET,
    OpCode::CALL_EDT,
    OpCode::THROW,
    OpCode::THROWIFNOT,
];

static BY_BYTE: Lazy<[Option<OpCode>; 256]> = Lazy::new(|| {
    let mut table = [None; 256];
    for opcode in ALL {
        table[*opcode as usize] = Some(*opcode);
    }
    table
});

static BY_NAME: Lazy<HashMap<String, OpCode>> =
    Lazy::new(|| ALL.iter().map(|op| (op.name(), *op)).collect());

impl OpCode {
    /// Looks up the opcode for a byte, returning `None` for unassigned bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        BY_BYTE[byte as usize]
    }

    /// Looks up an opcode by its mnemonic, e.g. `"PUSHDATA1"`.
    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    /// Iterates over every opcode in byte order.
    pub fn iter() -> impl Iterator<Item = OpCode> {
        ALL.iter().copied()
    }

    /// Returns the mnemonic of the opcode.
    pub fn name(&self) -> String {
        format!("{self:?}")
    }

    /// Returns the payload rule declared for this opcode.
    pub fn operand_size(&self) -> OperandSize {
        operand_size::rule_for(*self)
    }

    /// Returns true for opcodes that only push a constant.
    pub fn is_push(&self) -> bool {
        *self <= OpCode::PUSH16
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_values() {
        assert_eq!(OpCode::PUSH0 as u8, 0x00);
        assert_eq!(OpCode::PUSHBYTES75 as u8, 0x4B);
        assert_eq!(OpCode::PUSH1 as u8, 0x51);
        assert_eq!(OpCode::PUSH16 as u8, 0x60);
        assert_eq!(OpCode::RET as u8, 0x66);
        assert_eq!(OpCode::ADD as u8, 0x93);
        assert_eq!(OpCode::THROWIFNOT as u8, 0xF1);
    }

    #[test]
    fn test_from_byte_round_trip() {
        for opcode in OpCode::iter() {
            assert_eq!(OpCode::from_byte(opcode as u8), Some(opcode));
        }
        assert_eq!(OpCode::from_byte(0x50), None);
        assert_eq!(OpCode::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(OpCode::from_name("CALL_EDT"), Some(OpCode::CALL_EDT));
        assert_eq!(OpCode::from_name("PUSHBYTES20"), Some(OpCode::PUSHBYTES20));
        assert_eq!(OpCode::from_name("PUSHINT8"), None);
    }

    #[test]
    fn test_is_push() {
        assert!(OpCode::PUSHDATA4.is_push());
        assert!(OpCode::PUSH16.is_push());
        assert!(!OpCode::NOP.is_push());
    }
}
