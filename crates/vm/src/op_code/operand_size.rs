//! Operand size information for opcodes.
//!
//! Each opcode declares its payload rule exactly once, in [`RULES`]; the
//! decoder consults this table instead of deriving the length per decode.

use super::OpCode;
use once_cell::sync::Lazy;

/// Width and signedness of a runtime-read length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixWidth {
    U8,
    I16,
    U16,
    I32,
    U32,
}

impl PrefixWidth {
    /// Number of bytes occupied by the prefix itself.
    pub fn size(&self) -> usize {
        match self {
            PrefixWidth::U8 => 1,
            PrefixWidth::I16 | PrefixWidth::U16 => 2,
            PrefixWidth::I32 | PrefixWidth::U32 => 4,
        }
    }
}

/// Represents the operand size information for an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSize {
    /// A fixed number of payload bytes (zero for opcodes without payload).
    Fixed(usize),

    /// The payload length is read from a prefix of the given width.
    Prefix(PrefixWidth),

    /// A one-byte length followed by that many bytes; lengths of
    /// [`OperandSize::SHORT_STRING_LIMIT`] and above are invalid.
    ShortString,
}

impl OperandSize {
    /// First invalid length byte of the short-string convention.
    pub const SHORT_STRING_LIMIT: u8 = 252;

    /// Creates a new operand size with a fixed size.
    pub fn fixed(size: usize) -> Self {
        Self::Fixed(size)
    }

    /// Creates a new operand size with a size prefix.
    pub fn prefix(width: PrefixWidth) -> Self {
        Self::Prefix(width)
    }

    /// Gets the fixed size of the operand, zero for variable rules.
    pub fn size(&self) -> usize {
        match self {
            OperandSize::Fixed(size) => *size,
            _ => 0,
        }
    }

    /// Gets the size of the length prefix, zero for fixed rules.
    pub fn size_prefix(&self) -> usize {
        match self {
            OperandSize::Fixed(_) => 0,
            OperandSize::Prefix(width) => width.size(),
            OperandSize::ShortString => 1,
        }
    }

    /// Checks if the operand has a fixed, non-zero size.
    pub fn has_fixed_size(&self) -> bool {
        matches!(self, OperandSize::Fixed(size) if *size > 0)
    }

    /// Checks if the operand has a size prefix.
    pub fn has_size_prefix(&self) -> bool {
        self.size_prefix() > 0
    }
}

static RULES: Lazy<[OperandSize; 256]> = Lazy::new(|| {
    let mut table = [OperandSize::Fixed(0); 256];
    for n in 1..=75usize {
        table[n] = OperandSize::Fixed(n);
    }
    table[OpCode::PUSHDATA1 as usize] = OperandSize::Prefix(PrefixWidth::U8);
    table[OpCode::PUSHDATA2 as usize] = OperandSize::Prefix(PrefixWidth::U16);
    table[OpCode::PUSHDATA4 as usize] = OperandSize::Prefix(PrefixWidth::I32);
    table[OpCode::JMP as usize] = OperandSize::Fixed(2);
    table[OpCode::JMPIF as usize] = OperandSize::Fixed(2);
    table[OpCode::JMPIFNOT as usize] = OperandSize::Fixed(2);
    table[OpCode::CALL as usize] = OperandSize::Fixed(2);
    table[OpCode::APPCALL as usize] = OperandSize::Fixed(20);
    table[OpCode::TAILCALL as usize] = OperandSize::Fixed(20);
    table[OpCode::SYSCALL as usize] = OperandSize::ShortString;
    table[OpCode::CALL_I as usize] = OperandSize::Fixed(4);
    table[OpCode::CALL_E as usize] = OperandSize::Fixed(22);
    table[OpCode::CALL_ED as usize] = OperandSize::Fixed(2);
    table[OpCode::CALL_ET as usize] = OperandSize::Fixed(22);
    table[OpCode::CALL_EDT as usize] = OperandSize::Fixed(2);
    table
});

/// Returns the payload rule of `opcode`.
pub fn rule_for(opcode: OpCode) -> OperandSize {
    RULES[opcode as usize]
}
