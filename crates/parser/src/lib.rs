use lockstep_common::{ArchSpec, InstructionError};

/// What one raw source line parses to. Blank lines and full-line comments
/// are skipped, not errors; skipped lines still count for line numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Skip,
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
}

/// A resolved operand: a canonical register name or a literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(&'static str),
    Immediate(i64),
}

/// Tokenize one line: strip any trailing comment, split on whitespace and
/// commas, uppercase the mnemonic. Operand tokens stay raw; nothing is
/// validated or resolved here.
pub fn parse_line(raw: &str) -> Line {
    let code = strip_comment(raw).trim();
    if code.is_empty() {
        return Line::Skip;
    }

    let mut tokens = code
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty());

    match tokens.next() {
        Some(mnemonic) => Line::Instruction {
            mnemonic: mnemonic.to_ascii_uppercase(),
            operands: tokens.map(str::to_string).collect(),
        },
        None => Line::Skip,
    }
}

/// Both comment markers are recognized for both architectures; the earlier
/// one wins when a line contains both.
fn strip_comment(line: &str) -> &str {
    match [line.find("//"), line.find(';')].into_iter().flatten().min() {
        Some(index) => &line[..index],
        None => line,
    }
}

/// Parse an integer literal: optional sign, decimal or 0x-prefixed hex,
/// case-insensitive. Hex literals too large for i64 are accepted as the
/// equivalent 64-bit pattern.
pub fn parse_int_literal(text: &str) -> Result<i64, InstructionError> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
            .or_else(|_| u64::from_str_radix(hex, 16).map(|bits| bits as i64))
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| InstructionError::InvalidImmediate(text.to_string()))?;

    Ok(if negative { value.wrapping_neg() } else { value })
}

/// Classify one operand token against an architecture. With an immediate
/// marker, the marker decides; without one, register lookup is tried first
/// and the literal parse is the fallback.
pub fn resolve_operand(arch: &ArchSpec, token: &str) -> Result<Operand, InstructionError> {
    if let Some(marker) = arch.immediate_prefix {
        return match token.strip_prefix(marker) {
            Some(literal) => parse_int_literal(literal)
                .map(Operand::Immediate)
                .map_err(|_| InstructionError::InvalidImmediate(token.to_string())),
            None => arch
                .canonical_register(token)
                .map(Operand::Register)
                .ok_or_else(|| InstructionError::InvalidRegister(token.to_string())),
        };
    }

    if let Some(register) = arch.canonical_register(token) {
        return Ok(Operand::Register(register));
    }
    match parse_int_literal(token) {
        Ok(value) => Ok(Operand::Immediate(value)),
        Err(_) if looks_numeric(token) => {
            Err(InstructionError::InvalidImmediate(token.to_string()))
        }
        Err(_) => Err(InstructionError::InvalidRegister(token.to_string())),
    }
}

/// Resolve a token that must name a register (destinations).
pub fn resolve_register(
    arch: &ArchSpec,
    token: &str,
) -> Result<&'static str, InstructionError> {
    arch.canonical_register(token)
        .ok_or_else(|| InstructionError::InvalidRegister(token.to_string()))
}

fn looks_numeric(token: &str) -> bool {
    token
        .strip_prefix(['-', '+'])
        .unwrap_or(token)
        .starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use lockstep_common::{A64, X64};

    use super::*;

    fn instruction(raw: &str) -> (String, Vec<String>) {
        match parse_line(raw) {
            Line::Instruction { mnemonic, operands } => (mnemonic, operands),
            Line::Skip => panic!("expected an instruction from: {raw}"),
        }
    }

    #[test]
    fn test_blank_and_comment_lines_skip() {
        assert_eq!(parse_line(""), Line::Skip);
        assert_eq!(parse_line("   \t "), Line::Skip);
        assert_eq!(parse_line("// full line comment"), Line::Skip);
        assert_eq!(parse_line("; also a comment"), Line::Skip);
        assert_eq!(parse_line("   ; indented comment"), Line::Skip);
    }

    #[test]
    fn test_tokenizes_on_whitespace_and_commas() {
        let (mnemonic, operands) = instruction("ADD X2, X0, X1");
        assert_eq!(mnemonic, "ADD");
        assert_eq!(operands, vec!["X2", "X0", "X1"]);

        // Commas without spaces, repeated separators.
        let (_, operands) = instruction("add x2,x0,,  x1");
        assert_eq!(operands, vec!["x2", "x0", "x1"]);
    }

    #[test]
    fn test_mnemonic_is_uppercased_operands_are_raw() {
        let (mnemonic, operands) = instruction("mov x0, #42");
        assert_eq!(mnemonic, "MOV");
        assert_eq!(operands, vec!["x0", "#42"]);
    }

    #[test]
    fn test_inline_comments_stripped() {
        let (mnemonic, operands) = instruction("MOV X0, #1 // set up");
        assert_eq!(mnemonic, "MOV");
        assert_eq!(operands, vec!["X0", "#1"]);

        let (_, operands) = instruction("MOV X0, #1 ; set up");
        assert_eq!(operands, vec!["X0", "#1"]);

        // Earliest marker wins.
        let (_, operands) = instruction("NOP ; one // two");
        assert!(operands.is_empty());
    }

    #[test]
    fn test_int_literals() {
        assert_eq!(parse_int_literal("42").unwrap(), 42);
        assert_eq!(parse_int_literal("0x2A").unwrap(), 42);
        assert_eq!(parse_int_literal("0X2a").unwrap(), 42);
        assert_eq!(parse_int_literal("-5").unwrap(), -5);
        assert_eq!(parse_int_literal("+5").unwrap(), 5);
        assert_eq!(parse_int_literal("-0x10").unwrap(), -16);
        assert_eq!(parse_int_literal("0").unwrap(), 0);
        // Full-width hex is the 64-bit pattern.
        assert_eq!(parse_int_literal("0xFFFFFFFFFFFFFFFF").unwrap(), -1);
    }

    #[test]
    fn test_malformed_literals() {
        assert!(parse_int_literal("zz").is_err());
        assert!(parse_int_literal("0xZZ").is_err());
        assert!(parse_int_literal("12ab").is_err());
        assert!(parse_int_literal("").is_err());
        assert!(parse_int_literal("0x").is_err());
    }

    #[test]
    fn test_a64_operands() {
        assert_eq!(resolve_operand(&A64, "#42").unwrap(), Operand::Immediate(42));
        assert_eq!(
            resolve_operand(&A64, "#0x2A").unwrap(),
            Operand::Immediate(42)
        );
        assert_eq!(resolve_operand(&A64, "#-1").unwrap(), Operand::Immediate(-1));
        assert_eq!(resolve_operand(&A64, "x5").unwrap(), Operand::Register("X5"));
        assert_eq!(
            resolve_operand(&A64, "lr").unwrap(),
            Operand::Register("X30")
        );

        assert_eq!(
            resolve_operand(&A64, "#zz"),
            Err(InstructionError::InvalidImmediate("#zz".to_string()))
        );
        // Without the marker, a bare number is not an immediate here.
        assert_eq!(
            resolve_operand(&A64, "42"),
            Err(InstructionError::InvalidRegister("42".to_string()))
        );
    }

    #[test]
    fn test_x64_operands_fall_back_to_literals() {
        assert_eq!(
            resolve_operand(&X64, "rax").unwrap(),
            Operand::Register("RAX")
        );
        assert_eq!(resolve_operand(&X64, "42").unwrap(), Operand::Immediate(42));
        assert_eq!(
            resolve_operand(&X64, "0xFF").unwrap(),
            Operand::Immediate(255)
        );
        assert_eq!(resolve_operand(&X64, "-7").unwrap(), Operand::Immediate(-7));

        // Numeric-looking garbage is a bad immediate, the rest a bad register.
        assert_eq!(
            resolve_operand(&X64, "0xZZ"),
            Err(InstructionError::InvalidImmediate("0xZZ".to_string()))
        );
        assert_eq!(
            resolve_operand(&X64, "RBZ"),
            Err(InstructionError::InvalidRegister("RBZ".to_string()))
        );
    }

    #[test]
    fn test_destination_must_be_register() {
        assert_eq!(resolve_register(&A64, "X0").unwrap(), "X0");
        assert_eq!(resolve_register(&A64, "xzr").unwrap(), "XZR");
        assert!(resolve_register(&A64, "#1").is_err());
        assert!(resolve_register(&X64, "13").is_err());
    }
}
