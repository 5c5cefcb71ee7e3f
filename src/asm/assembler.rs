//! Text front end for programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! DAT 0 7            ; memory[0] := 7 before the run
//! load 0             ; operation with an address
//! xor(1), store(2)   ; call form, several per line
//! lshift             ; no argument
//! ```
//!
//! Numbers are decimal, `0x` hex or `0b` binary. Everything stays in
//! memory; nothing is read from or written to disk here.

use crate::cpu::decode::{DecodeError, Instruction};
use crate::error::ErrorKind;
use thiserror::Error;

/// The result of assembling a source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// `(address, value)` pairs from `DAT` lines, in source order.
    pub data: Vec<(usize, u64)>,
}

/// Assemble source text into instructions and initial data.
pub fn assemble(source: &str) -> Result<Assembly, AssemblerError> {
    let mut output = Assembly::default();

    for (line_num, line) in source.lines().enumerate() {
        let line_num = line_num + 1;

        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };

        for statement in line.split(',') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            process_statement(statement, line_num, &mut output)?;
        }
    }

    Ok(output)
}

fn process_statement(
    statement: &str,
    line_num: usize,
    output: &mut Assembly,
) -> Result<(), AssemblerError> {
    let (mnemonic, operands) = split_statement(statement, line_num)?;

    if mnemonic.eq_ignore_ascii_case("DAT") || mnemonic.eq_ignore_ascii_case("DATA") {
        let [address, value] = operands.as_slice() else {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: "DAT requires an address and a value".into(),
            });
        };
        let address = parse_address(address, line_num)?;
        let value = parse_number(value, line_num)?;
        output.data.push((address, value));
        return Ok(());
    }

    let args = operands
        .iter()
        .map(|operand| parse_address(operand, line_num))
        .collect::<Result<Vec<_>, _>>()?;

    let instruction = Instruction::named(mnemonic, &args)
        .map_err(|source| AssemblerError::Instruction { line: line_num, source })?;
    output.instructions.push(instruction);
    Ok(())
}

/// Split `name(arg)` or `name arg ...` into a mnemonic and operands.
fn split_statement(statement: &str, line_num: usize) -> Result<(&str, Vec<&str>), AssemblerError> {
    if let Some(open) = statement.find('(') {
        let inner = statement[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unclosed '(' in {:?}", statement),
            })?;
        let mnemonic = statement[..open].trim();
        let operands = inner.split_whitespace().collect();
        return Ok((mnemonic, operands));
    }

    let mut parts = statement.split_whitespace();
    let mnemonic = parts.next().unwrap_or_default();
    Ok((mnemonic, parts.collect()))
}

fn parse_address(operand: &str, line_num: usize) -> Result<usize, AssemblerError> {
    let value = parse_number(operand, line_num)?;
    usize::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange {
        line: line_num,
        value: operand.to_string(),
    })
}

fn parse_number(operand: &str, line_num: usize) -> Result<u64, AssemblerError> {
    let operand = operand.trim();
    let lower = operand.to_ascii_lowercase();

    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        lower.parse::<u64>()
    };

    parsed.map_err(|_| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid number {:?}", operand),
    })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("line {line}: {source}")]
    Instruction { line: usize, source: DecodeError },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: String },
}

impl AssemblerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssemblerError::SyntaxError { .. } => ErrorKind::InvalidArgument,
            AssemblerError::Instruction { source, .. } => source.kind(),
            AssemblerError::ValueOutOfRange { .. } => ErrorKind::OutOfRange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Operation;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Half adder
            load 0
            xor 1
            store 2
            lshift
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.instructions.len(), 4);
        assert_eq!(result.instructions[0], Instruction::with_address(Operation::Load, 0));
        assert_eq!(result.instructions[3], Instruction::op(Operation::LeftShift));
        assert!(result.data.is_empty());
    }

    #[test]
    fn test_assemble_call_form() {
        let result = assemble("load(0), xor(0x1), store(0b10), lshift()").unwrap();
        assert_eq!(
            result.instructions,
            vec![
                Instruction::with_address(Operation::Load, 0),
                Instruction::with_address(Operation::Xor, 1),
                Instruction::with_address(Operation::Store, 2),
                Instruction::op(Operation::LeftShift),
            ]
        );
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            DAT 0 7
            dat 1 0xFF   ; trailing comment
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.data, vec![(0, 7), (1, 255)]);
        assert!(result.instructions.is_empty());
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = assemble("load 0\njump 3").unwrap_err();
        assert!(matches!(err, AssemblerError::Instruction { line: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
    }

    #[test]
    fn test_too_many_operands() {
        let err = assemble("load 1 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            assemble("load(0").unwrap_err(),
            AssemblerError::SyntaxError { line: 1, .. }
        ));
        assert!(matches!(
            assemble("\n\nload -1").unwrap_err(),
            AssemblerError::SyntaxError { line: 3, .. }
        ));
        assert!(matches!(
            assemble("DAT 1").unwrap_err(),
            AssemblerError::SyntaxError { .. }
        ));
    }
}
