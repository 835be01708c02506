use std::collections::HashSet;

use indexmap::IndexMap;
use lockstep_common::{
    arith, ArchSpec, ExecutionResult, FlagStyle, InstructionError, Op, RegisterView, A64, X64,
};
use lockstep_parser::{parse_line, resolve_operand, resolve_register, Line, Operand};

/// Reset value for the stack register.
const STACK_BASE: i64 = 0x0010_0000;

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    zero: bool,
    negative: bool,
    carry: bool,
    overflow: bool,
    parity: bool,
}

/// One architecture instance: register file, flags, modified-set and trace.
/// Both simulated instruction sets run on this same machine; the `ArchSpec`
/// supplies register names, the mnemonic table and display conventions.
#[derive(Debug)]
pub struct Simulator {
    arch: &'static ArchSpec,
    registers: IndexMap<&'static str, i64>,
    flags: Flags,
    modified: HashSet<&'static str>,
    trace: Vec<String>,
    halted: bool,
    executed: usize,
}

impl Simulator {
    pub fn new(arch: &'static ArchSpec) -> Self {
        let mut sim = Self {
            arch,
            registers: IndexMap::new(),
            flags: Flags::default(),
            modified: HashSet::new(),
            trace: Vec::new(),
            halted: false,
            executed: 0,
        };
        sim.reset();
        sim
    }

    pub fn aarch64() -> Self {
        Self::new(&A64)
    }

    pub fn x86_64() -> Self {
        Self::new(&X64)
    }

    pub fn arch(&self) -> &'static ArchSpec {
        self.arch
    }

    /// Reinitialize registers, flags, modified-set and trace. The stack
    /// register parks at a fixed sentinel; everything else is zero.
    pub fn reset(&mut self) {
        self.registers.clear();
        for &name in self.arch.registers {
            self.registers.insert(name, 0);
        }
        self.registers.insert(self.arch.stack_register, STACK_BASE);
        self.flags = Flags::default();
        self.modified.clear();
        self.trace.clear();
        self.halted = false;
        self.executed = 0;
    }

    /// Run a whole program: reset, then execute line by line until the end
    /// of source, a halt instruction, or the first error. Errors abort the
    /// run but are reported in the result, never thrown.
    pub fn execute(&mut self, source: &str) -> ExecutionResult {
        self.reset();

        for (index, raw) in source.lines().enumerate() {
            let (mnemonic, operands) = match parse_line(raw) {
                Line::Skip => continue,
                Line::Instruction { mnemonic, operands } => (mnemonic, operands),
            };

            if let Err(err) = self.step(&mnemonic, &operands) {
                let message = format!("Error on line {}: {err}", index + 1);
                self.trace.push(message.clone());
                return ExecutionResult {
                    success: false,
                    output: self.trace.join("\n"),
                    error: Some(message),
                };
            }

            self.executed += 1;
            if self.halted {
                break;
            }
        }

        self.trace
            .push(format!("Execution finished ({} instructions)", self.executed));
        ExecutionResult {
            success: true,
            output: self.trace.join("\n"),
            error: None,
        }
    }

    /// Snapshot of every register slot in declaration order. The zero
    /// register owns no slot and therefore never appears.
    pub fn register_state(&self) -> IndexMap<&'static str, RegisterView> {
        self.registers
            .iter()
            .map(|(&name, &value)| {
                (
                    name,
                    RegisterView {
                        value: value.to_string(),
                        hex: format!("0x{:016X}", value as u64),
                        modified: self.modified.contains(name),
                    },
                )
            })
            .collect()
    }

    /// The full fixed flag set of the active architecture, display order.
    pub fn flags_state(&self) -> IndexMap<&'static str, bool> {
        let f = self.flags;
        match self.arch.flag_style {
            FlagStyle::Nzcv => IndexMap::from([
                ("N", f.negative),
                ("Z", f.zero),
                ("C", f.carry),
                ("V", f.overflow),
            ]),
            FlagStyle::Eflags => IndexMap::from([
                ("CF", f.carry),
                ("PF", f.parity),
                ("ZF", f.zero),
                ("SF", f.negative),
                ("OF", f.overflow),
            ]),
        }
    }

    fn step(&mut self, mnemonic: &str, operands: &[String]) -> Result<(), InstructionError> {
        let pattern = self
            .arch
            .pattern(mnemonic)
            .ok_or_else(|| InstructionError::UnknownInstruction(mnemonic.to_string()))?;

        let required = pattern.arity - 1;
        if operands.len() < required {
            return Err(InstructionError::WrongOperandCount {
                mnemonic: mnemonic.to_string(),
                expected: required,
                got: operands.len(),
            });
        }

        match pattern.op {
            Op::Nop => self.trace.push("NOP".to_string()),
            Op::Halt => {
                self.halted = true;
                self.trace.push(format!("{mnemonic} => halt"));
            }
            Op::Mov => {
                let dest = resolve_register(self.arch, &operands[0])?;
                let (value, text) = self.source_value(&operands[1])?;
                self.write_register(dest, value);
                self.trace.push(format!(
                    "{mnemonic} {dest}, {text} => {value} (0x{:016X})",
                    value as u64
                ));
            }
            Op::Cmp => {
                let (a, a_text) = self.source_value(&operands[0])?;
                let (b, b_text) = self.source_value(&operands[1])?;
                let result = a.wrapping_sub(b);
                self.update_flags(Op::Cmp, a, b, result);
                let summary = self.flags_summary();
                self.trace
                    .push(format!("{mnemonic} {a_text}, {b_text} => {summary}"));
            }
            Op::Inc | Op::Dec => {
                let dest = resolve_register(self.arch, &operands[0])?;
                let a = self.read_register(dest);
                let result = if pattern.op == Op::Inc {
                    a.wrapping_add(1)
                } else {
                    a.wrapping_sub(1)
                };
                self.write_register(dest, result);
                self.update_flags(pattern.op, a, 1, result);
                self.trace.push(format!(
                    "{mnemonic} {dest}({a}) => {result} (0x{:016X})",
                    result as u64
                ));
            }
            Op::Add | Op::Sub | Op::Mul | Op::And | Op::Or | Op::Xor | Op::Lsl | Op::Lsr => {
                let dest = resolve_register(self.arch, &operands[0])?;
                let (a, a_text, b, b_text) = if self.arch.dest_is_source {
                    let a = self.read_register(dest);
                    let (b, b_text) = self.source_value(&operands[1])?;
                    (a, format!("{dest}({a})"), b, b_text)
                } else {
                    let (a, a_text) = self.source_value(&operands[1])?;
                    let (b, b_text) = self.source_value(&operands[2])?;
                    (a, a_text, b, b_text)
                };

                let result = binary_op(pattern.op, a, b);
                self.write_register(dest, result);
                self.update_flags(pattern.op, a, b, result);

                let line = if self.arch.dest_is_source {
                    format!(
                        "{mnemonic} {a_text}, {b_text} => {result} (0x{:016X})",
                        result as u64
                    )
                } else {
                    format!(
                        "{mnemonic} {dest}, {a_text}, {b_text} => {result} (0x{:016X})",
                        result as u64
                    )
                };
                self.trace.push(line);
            }
        }

        Ok(())
    }

    fn update_flags(&mut self, op: Op, a: i64, b: i64, result: i64) {
        match op {
            Op::Sub | Op::Cmp | Op::Dec => {
                self.flags.carry = arith::carry_from_sub(a, b);
                self.flags.overflow = arith::overflow_from_sub(a, b, result);
                self.set_result_flags(result);
            }
            Op::Inc => {
                self.flags.carry = arith::carry_from_add(a, b);
                self.flags.overflow = arith::overflow_from_add(a, b, result);
                self.set_result_flags(result);
            }
            // Bitwise results refresh only the result flags; carry and
            // overflow keep whatever the previous flag-affecting
            // instruction left behind.
            Op::And | Op::Or | Op::Xor => self.set_result_flags(result),
            _ => {}
        }
    }

    fn set_result_flags(&mut self, result: i64) {
        self.flags.zero = result == 0;
        self.flags.negative = result < 0;
        self.flags.parity = arith::parity_even(result);
    }

    fn write_register(&mut self, name: &'static str, value: i64) {
        if self.arch.is_zero_register(name) {
            return;
        }
        self.registers.insert(name, value);
        self.modified.insert(name);
    }

    fn read_register(&self, name: &'static str) -> i64 {
        if self.arch.is_zero_register(name) {
            return 0;
        }
        self.registers.get(name).copied().unwrap_or(0)
    }

    /// Resolve a source operand to its value plus the display text used in
    /// trace lines: `X1(8)` for registers, the plain value for immediates.
    fn source_value(&self, token: &str) -> Result<(i64, String), InstructionError> {
        match resolve_operand(self.arch, token)? {
            Operand::Register(name) => {
                let value = self.read_register(name);
                Ok((value, format!("{name}({value})")))
            }
            Operand::Immediate(value) => Ok((value, value.to_string())),
        }
    }

    fn flags_summary(&self) -> String {
        let f = self.flags;
        match self.arch.flag_style {
            FlagStyle::Nzcv => format!(
                "N={} Z={} C={} V={}",
                f.negative as u8, f.zero as u8, f.carry as u8, f.overflow as u8
            ),
            FlagStyle::Eflags => format!(
                "CF={} PF={} ZF={} SF={} OF={}",
                f.carry as u8, f.parity as u8, f.zero as u8, f.negative as u8, f.overflow as u8
            ),
        }
    }
}

fn binary_op(op: Op, a: i64, b: i64) -> i64 {
    match op {
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::And => a & b,
        Op::Or => a | b,
        Op::Xor => a ^ b,
        Op::Lsl => ((a as u64) << shift_amount(b)) as i64,
        Op::Lsr => ((a as u64) >> shift_amount(b)) as i64,
        _ => unreachable!("not a binary operation: {op:?}"),
    }
}

/// Shift counts wrap into 0..64, matching the register width.
fn shift_amount(count: i64) -> u32 {
    (count as u64 & 63) as u32
}
