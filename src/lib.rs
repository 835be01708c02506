//! Line-oriented instruction simulator for two toy instruction sets: a
//! reduced ARM64-like set and a reduced x86-64-like set.
//!
//! `lockstep-common` carries the per-architecture tables and shared types,
//! `lockstep-parser` the line tokenizer; the [`Simulator`] here executes one
//! parsed line at a time against a register/flag machine and narrates every
//! step into a trace.

pub mod sim;

pub use lockstep_common::{
    ArchSpec, ExecutionResult, FlagStyle, InstructionError, Op, RegisterView, A64, X64,
};
pub use sim::Simulator;
