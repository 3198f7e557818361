//! Trigger types.

use std::fmt;
use std::str::FromStr;

/// The mode a script runs under, visible to interop handlers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerType {
    /// Checks whether a transaction or block is valid.
    Verification = 0x00,

    /// Verification run against the outputs of a transaction.
    VerificationR = 0x01,

    /// Invocation of a contract as part of a transaction.
    #[default]
    Application = 0x10,

    /// Application run triggered by an incoming transfer.
    ApplicationR = 0x11,
}

impl TriggerType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Verification),
            0x01 => Some(Self::VerificationR),
            0x10 => Some(Self::Application),
            0x11 => Some(Self::ApplicationR),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn is_verification(self) -> bool {
        matches!(self, Self::Verification | Self::VerificationR)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Verification => "Verification",
            Self::VerificationR => "VerificationR",
            Self::Application => "Application",
            Self::ApplicationR => "ApplicationR",
        };
        f.write_str(name)
    }
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Verification" => Ok(Self::Verification),
            "VerificationR" => Ok(Self::VerificationR),
            "Application" => Ok(Self::Application),
            "ApplicationR" => Ok(Self::ApplicationR),
            _ => Err(format!("unknown trigger type: {s}")),
        }
    }
}
