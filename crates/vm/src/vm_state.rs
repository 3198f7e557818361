//! VM state implementation.

use std::fmt;
use std::str::FromStr;

/// Indicates the status of the VM.
///
/// `HALT` and `FAULT` are terminal: once an engine reaches either state no
/// further instruction is executed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum VMState {
    /// Indicates that the execution is in progress or has not yet begun.
    #[default]
    NONE = 0,

    /// Indicates that the execution has been completed successfully.
    HALT = 1 << 0,

    /// Indicates that the execution has ended with an error.
    FAULT = 1 << 1,
}

impl VMState {
    #[inline]
    pub fn is_none(self) -> bool {
        self == VMState::NONE
    }

    #[inline]
    pub fn is_halt(self) -> bool {
        self == VMState::HALT
    }

    #[inline]
    pub fn is_fault(self) -> bool {
        self == VMState::FAULT
    }

    /// True for `HALT` and `FAULT`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, VMState::HALT | VMState::FAULT)
    }
}

impl fmt::Display for VMState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VMState::NONE => "NONE",
            VMState::HALT => "HALT",
            VMState::FAULT => "FAULT",
        };
        f.write_str(name)
    }
}

impl FromStr for VMState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(VMState::NONE),
            "HALT" => Ok(VMState::HALT),
            "FAULT" => Ok(VMState::FAULT),
            _ => Err(format!("unknown VM state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!VMState::NONE.is_terminal());
        assert!(VMState::HALT.is_terminal());
        assert!(VMState::FAULT.is_terminal());
        assert_eq!(VMState::default(), VMState::NONE);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("halt".parse::<VMState>().unwrap(), VMState::HALT);
        assert_eq!(VMState::FAULT.to_string(), "FAULT");
        assert!("BREAK".parse::<VMState>().is_err());
    }
}
