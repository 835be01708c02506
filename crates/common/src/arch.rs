use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::Op;

/// One row of a mnemonic table. `arity` is the minimum token count for the
/// instruction including the mnemonic itself; surplus tokens are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPattern {
    pub op: Op,
    pub mnemonic: &'static str,
    pub arity: usize,
}

impl InstructionPattern {
    const fn new(op: Op, mnemonic: &'static str, arity: usize) -> Self {
        Self { op, mnemonic, arity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// N Z C V
    Nzcv,
    /// CF PF ZF SF OF
    Eflags,
}

/// Everything that distinguishes one simulated architecture from the other.
/// The executor itself is generic; it only ever consults this table.
#[derive(Debug)]
pub struct ArchSpec {
    pub name: &'static str,
    /// Canonical register names in snapshot order. The zero register is not
    /// listed here; it owns no slot.
    pub registers: &'static [&'static str],
    /// Alternate spellings resolved before lookup (e.g. LR for X30).
    pub aliases: &'static [(&'static str, &'static str)],
    /// Names that read as zero and silently discard writes.
    pub zero_registers: &'static [&'static str],
    pub stack_register: &'static str,
    /// Immediate literal marker, if the syntax has one. Without a marker,
    /// any token that is not a known register is tried as a literal.
    pub immediate_prefix: Option<char>,
    /// Two-operand form: the destination doubles as the first source.
    pub dest_is_source: bool,
    pub flag_style: FlagStyle,
    patterns: &'static Lazy<HashMap<&'static str, InstructionPattern>>,
}

impl ArchSpec {
    pub fn pattern(&self, mnemonic: &str) -> Option<InstructionPattern> {
        self.patterns
            .get(mnemonic.to_ascii_uppercase().as_str())
            .copied()
    }

    /// Case-insensitive register lookup, alias spellings included. Returns
    /// the canonical name, which for zero registers is the spelling used.
    pub fn canonical_register(&self, name: &str) -> Option<&'static str> {
        let resolved = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|&(_, target)| target);
        match resolved {
            Some(target) => self.lookup(target),
            None => self.lookup(name),
        }
    }

    pub fn is_zero_register(&self, name: &str) -> bool {
        self.zero_registers
            .iter()
            .any(|zero| zero.eq_ignore_ascii_case(name))
    }

    fn lookup(&self, name: &str) -> Option<&'static str> {
        self.registers
            .iter()
            .chain(self.zero_registers)
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
            .copied()
    }
}

static A64_REGISTERS: &[&str] = &[
    "X0", "X1", "X2", "X3", "X4", "X5", "X6", "X7", "X8", "X9", "X10", "X11", "X12", "X13", "X14",
    "X15", "X16", "X17", "X18", "X19", "X20", "X21", "X22", "X23", "X24", "X25", "X26", "X27",
    "X28", "X29", "X30", "SP",
];

static X64_REGISTERS: &[&str] = &[
    "RAX", "RBX", "RCX", "RDX", "RSI", "RDI", "RBP", "RSP", "R8", "R9", "R10", "R11", "R12",
    "R13", "R14", "R15",
];

static A64_PATTERNS: Lazy<HashMap<&'static str, InstructionPattern>> = Lazy::new(|| {
    static PATTERNS: &[InstructionPattern] = &[
        InstructionPattern::new(Op::Mov, "MOV", 3),
        InstructionPattern::new(Op::Mov, "MOVZ", 3),
        InstructionPattern::new(Op::Add, "ADD", 4),
        InstructionPattern::new(Op::Sub, "SUB", 4),
        InstructionPattern::new(Op::Mul, "MUL", 4),
        InstructionPattern::new(Op::And, "AND", 4),
        InstructionPattern::new(Op::Or, "ORR", 4),
        InstructionPattern::new(Op::Xor, "EOR", 4),
        InstructionPattern::new(Op::Lsl, "LSL", 4),
        InstructionPattern::new(Op::Lsr, "LSR", 4),
        InstructionPattern::new(Op::Cmp, "CMP", 3),
        InstructionPattern::new(Op::Nop, "NOP", 1),
        InstructionPattern::new(Op::Halt, "RET", 1),
    ];

    PATTERNS.iter().map(|p| (p.mnemonic, *p)).collect()
});

static X64_PATTERNS: Lazy<HashMap<&'static str, InstructionPattern>> = Lazy::new(|| {
    static PATTERNS: &[InstructionPattern] = &[
        InstructionPattern::new(Op::Mov, "MOV", 3),
        InstructionPattern::new(Op::Add, "ADD", 3),
        InstructionPattern::new(Op::Sub, "SUB", 3),
        InstructionPattern::new(Op::Mul, "MUL", 3),
        InstructionPattern::new(Op::And, "AND", 3),
        InstructionPattern::new(Op::Or, "OR", 3),
        InstructionPattern::new(Op::Xor, "XOR", 3),
        InstructionPattern::new(Op::Lsl, "SHL", 3),
        InstructionPattern::new(Op::Lsr, "SHR", 3),
        InstructionPattern::new(Op::Cmp, "CMP", 3),
        InstructionPattern::new(Op::Inc, "INC", 2),
        InstructionPattern::new(Op::Dec, "DEC", 2),
        InstructionPattern::new(Op::Nop, "NOP", 1),
        InstructionPattern::new(Op::Halt, "RET", 1),
        InstructionPattern::new(Op::Halt, "HLT", 1),
    ];

    PATTERNS.iter().map(|p| (p.mnemonic, *p)).collect()
});

pub static A64: ArchSpec = ArchSpec {
    name: "a64",
    registers: A64_REGISTERS,
    aliases: &[("LR", "X30")],
    zero_registers: &["XZR", "WZR"],
    stack_register: "SP",
    immediate_prefix: Some('#'),
    dest_is_source: false,
    flag_style: FlagStyle::Nzcv,
    patterns: &A64_PATTERNS,
};

pub static X64: ArchSpec = ArchSpec {
    name: "x64",
    registers: X64_REGISTERS,
    aliases: &[],
    zero_registers: &[],
    stack_register: "RSP",
    immediate_prefix: None,
    dest_is_source: true,
    flag_style: FlagStyle::Eflags,
    patterns: &X64_PATTERNS,
};
