use serde::Serialize;
use strum::{Display, EnumIter};
use thiserror::Error;

pub mod arch;
pub mod arith;

pub use arch::{ArchSpec, FlagStyle, InstructionPattern, A64, X64};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),
    #[error("Wrong number of operands for {mnemonic}: expected {expected}, got {got}")]
    WrongOperandCount {
        mnemonic: String,
        expected: usize,
        got: usize,
    },
    #[error("Invalid register name: {0}")]
    InvalidRegister(String),
    #[error("Invalid immediate value: {0}")]
    InvalidImmediate(String),
}

/// Operation tags the per-architecture mnemonic tables dispatch to.
/// One handler arm per tag; mnemonics never reach the executor as strings.
#[derive(Debug, Display, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, EnumIter)]
pub enum Op {
    Mov,
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Lsl,
    Lsr,
    Cmp,
    Inc,
    Dec,
    Nop,
    Halt,
}

/// The sole artifact a run returns: joined trace plus status.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Display form of one register: signed decimal, 16-digit uppercase hex of
/// the two's-complement bits, and whether it was written since reset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisterView {
    pub value: String,
    pub hex: String,
    pub modified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_offending_text() {
        let err = InstructionError::UnknownInstruction("FOO".to_string());
        assert_eq!(err.to_string(), "Unknown instruction: FOO");

        let err = InstructionError::WrongOperandCount {
            mnemonic: "ADD".to_string(),
            expected: 3,
            got: 2,
        };
        assert_eq!(
            err.to_string(),
            "Wrong number of operands for ADD: expected 3, got 2"
        );

        let err = InstructionError::InvalidRegister("X99".to_string());
        assert_eq!(err.to_string(), "Invalid register name: X99");

        let err = InstructionError::InvalidImmediate("#zz".to_string());
        assert_eq!(err.to_string(), "Invalid immediate value: #zz");
    }
}
