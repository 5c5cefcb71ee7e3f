//! Program listings.
//!
//! Renders an instruction list back to assembler text, one numbered line
//! per instruction, with the program counter marked.

use crate::cpu::decode::Instruction;
use crate::program::{Program, StepPhase};

/// Render a plain listing that `assemble` accepts back.
pub fn disassemble(instructions: &[Instruction]) -> String {
    let mut output = String::new();
    for instr in instructions {
        output.push_str(&format_instruction(instr));
        output.push('\n');
    }
    output
}

/// Render a numbered listing with a marker on the current instruction.
///
/// `>` marks an instruction waiting to be decoded, `*` one that has been
/// decoded and is waiting to execute.
pub fn listing(program: &Program) -> String {
    let mut output = String::new();

    for (addr, instr) in program.instructions().iter().enumerate() {
        let marker = match (addr == program.counter(), program.phase()) {
            (true, StepPhase::Fetch) => '>',
            (true, StepPhase::Decoded) => '*',
            (false, _) => ' ',
        };
        output.push_str(&format!("{} {:03}: {}\n", marker, addr, format_instruction(instr)));
    }

    if program.is_complete() {
        output.push_str(&format!("> {:03}: (end)\n", program.len()));
    }

    output
}

/// Format a single instruction as assembler text.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr.address() {
        Some(addr) => format!("{} {}", instr.operation(), addr),
        None => instr.operation().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assembler::assemble;
    use crate::cpu::decode::Operation;
    use crate::cpu::execute::Machine;

    #[test]
    fn test_disassemble_reassembles() {
        let source = "load 0\nxor 1\nlshift\nstore 2\n";
        let assembly = assemble(source).unwrap();
        assert_eq!(disassemble(&assembly.instructions), source);
    }

    #[test]
    fn test_listing_marks_counter() {
        let machine = Machine::new(8, 4).unwrap();
        let mut program = Program::with_instructions(
            machine,
            vec![
                Instruction::with_address(Operation::Load, 1),
                Instruction::op(Operation::Not),
            ],
        );

        assert_eq!(listing(&program), "> 000: load 1\n  001: not\n");

        program.step().unwrap();
        assert_eq!(listing(&program), "* 000: load 1\n  001: not\n");

        for _ in 0..3 {
            program.step().unwrap();
        }
        assert_eq!(listing(&program), "  000: load 1\n  001: not\n> 002: (end)\n");
    }
}
