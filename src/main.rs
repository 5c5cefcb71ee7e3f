//! Accumulator Emulator - CLI Entry Point
//!
//! Commands:
//! - `accu-emu run <source>` - Assemble inline source and play it
//! - `accu-emu demo` - Add two numbers with XOR/AND/shift
//! - `accu-emu list <source>` - Print the assembled listing

use accu::{
    assemble, listing, Instruction, MachineConfig, MachineSnapshot, Operation, PlayOutcome,
    Program, ProgramError,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "accu-emu")]
#[command(version = "0.1.0")]
#[command(about = "A single-accumulator teaching machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a program and play it to completion
    Run {
        /// Program text, e.g. "DAT 0 7, load 0, not, store 1"
        source: String,
        /// Set memory before the run (ADDR=VALUE, repeatable)
        #[arg(short, long = "set", value_parser = parse_assignment)]
        set: Vec<(usize, u64)>,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Run the XOR/AND/shift adder on two numbers
    Demo {
        #[arg(default_value = "7")]
        a: u64,
        #[arg(default_value = "1")]
        b: u64,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Assemble a program and print its listing
    List {
        /// Program text
        source: String,
    },
}

#[derive(Args)]
struct MachineArgs {
    /// JSON machine config; flags below override it
    #[arg(long)]
    config: Option<String>,
    /// Bits per word
    #[arg(short, long)]
    word_size: Option<u32>,
    /// Number of memory cells
    #[arg(short, long)]
    memory_size: Option<usize>,
    /// Pause between steps in milliseconds
    #[arg(short, long)]
    delay_ms: Option<u64>,
    /// Print the machine state after every change
    #[arg(short, long)]
    trace: bool,
    /// Print trace snapshots as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { source, set, machine }) => {
            run_program(&source, &set, &machine);
        }
        Some(Commands::Demo { a, b, machine }) => {
            run_demo(a, b, &machine);
        }
        Some(Commands::List { source }) => {
            list_program(&source);
        }
        None => {
            println!("Accumulator Emulator v0.1.0");
            println!("A single-accumulator teaching machine");
            println!();
            println!("Use --help for available commands");
            println!();
            let quiet = MachineArgs {
                config: None,
                word_size: None,
                memory_size: None,
                delay_ms: Some(0),
                trace: false,
                json: false,
            };
            run_demo(7, 1, &quiet);
        }
    }
}

fn parse_assignment(s: &str) -> Result<(usize, u64), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got {:?}", s))?;
    let addr = addr.trim().parse::<usize>().map_err(|e| format!("bad address: {}", e))?;
    let value = value.trim().parse::<u64>().map_err(|e| format!("bad value: {}", e))?;
    Ok((addr, value))
}

fn load_config(args: &MachineArgs) -> MachineConfig {
    let mut config = match &args.config {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("❌ Failed to read config: {}", e);
                    std::process::exit(1);
                }
            };
            match MachineConfig::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => MachineConfig::default(),
    };

    if let Some(word_size) = args.word_size {
        config.word_size = word_size;
    }
    if let Some(memory_size) = args.memory_size {
        config.memory_size = memory_size;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.step_delay_ms = delay_ms;
    }
    config
}

fn build_program(config: &MachineConfig, instructions: Vec<Instruction>) -> Program {
    let machine = match config.build_machine() {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("❌ Invalid machine: {}", e);
            std::process::exit(1);
        }
    };
    Program::with_instructions(machine, instructions).with_step_delay(config.step_delay())
}

fn attach_trace(program: &mut Program, json: bool) {
    program.machine_mut().register_observer(move |snapshot| {
        if json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("❌ Failed to encode snapshot: {}", e),
            }
        } else {
            println!("{}", format_snapshot(snapshot));
        }
    });
}

fn format_snapshot(s: &MachineSnapshot) -> String {
    let width = s.word_size as usize;
    let ir = match &s.instruction_register {
        Some(instr) => instr.to_string(),
        None => "-".to_string(),
    };
    format!(
        "{:>5} {:<8} ACC={:0w$b} AR={:<3} DR={:0w$b} IR={}",
        s.cycles,
        format!("{:?}", s.phase),
        s.accumulator,
        s.address_register,
        s.data_register,
        ir,
        w = width
    )
}

fn play(program: &mut Program) {
    match program.play() {
        Ok(PlayOutcome::Completed { steps }) => {
            tracing::debug!(steps, "completed");
        }
        Ok(PlayOutcome::Stopped { steps }) => {
            println!("⏸  Stopped after {} steps", steps);
        }
        Err(ProgramError::AlreadyComplete) => {
            println!("Nothing to run");
        }
        Err(e) => {
            eprintln!("❌ Error at instruction {}: {}", program.counter(), e);
            std::process::exit(1);
        }
    }
}

fn print_result(program: &Program) {
    let machine = program.machine();
    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", machine.cycles());
    println!("ACC: {} ({})", machine.accumulator(), machine.accumulator().value());
    println!("AR:  {}", machine.address_register());
    println!("DR:  {} ({})", machine.data_register(), machine.data_register().value());
    println!();
    println!("Memory (non-zero cells):");
    for (addr, word) in machine.memory().dump(0, machine.memory().size()) {
        if !word.is_zero() {
            println!("  [{:03}] {} = {}", addr, word, word.value());
        }
    }
}

fn run_program(source: &str, set: &[(usize, u64)], args: &MachineArgs) {
    let assembly = match assemble(source) {
        Ok(assembly) => assembly,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };
    println!("📝 Assembled {} instructions", assembly.instructions.len());

    let config = load_config(args);
    let mut program = build_program(&config, assembly.instructions);

    for &(addr, value) in assembly.data.iter().chain(set) {
        if let Err(e) = program.machine_mut().write(value, addr) {
            eprintln!("❌ Failed to set memory: {}", e);
            std::process::exit(1);
        }
    }

    if args.trace || args.json {
        attach_trace(&mut program, args.json);
    }

    play(&mut program);
    print_result(&program);
}

/// The ripple adder: XOR gives the sum without carries, AND shifted left
/// gives the carries. Repeat until no carry is left.
fn adder_instructions() -> Vec<Instruction> {
    use Operation::*;
    vec![
        Instruction::with_address(Load, 0),
        Instruction::with_address(Xor, 1),
        Instruction::with_address(Store, 2),
        Instruction::with_address(Load, 0),
        Instruction::with_address(And, 1),
        Instruction::op(LeftShift),
        Instruction::with_address(Store, 1),
        Instruction::with_address(Load, 2),
        Instruction::with_address(Store, 0),
    ]
}

fn run_demo(a: u64, b: u64, args: &MachineArgs) {
    let mut config = load_config(args);
    if args.delay_ms.is_none() {
        config.step_delay_ms = 0;
    }
    let mut program = build_program(&config, adder_instructions());

    for (addr, value) in [(0, a), (1, b)] {
        if let Err(e) = program.machine_mut().write(value, addr) {
            eprintln!("❌ Failed to set memory: {}", e);
            std::process::exit(1);
        }
    }

    println!("━━━ Adder: {} + {} ({}-bit words) ━━━", a, b, config.word_size);
    print!("{}", listing(&program));
    println!();

    if args.trace || args.json {
        attach_trace(&mut program, args.json);
    }

    let mut passes = 0;
    loop {
        let carry = match program.machine().memory().read(1) {
            Ok(carry) => carry,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        };
        if carry == 0 {
            break;
        }
        program.rewind();
        play(&mut program);
        passes += 1;
    }

    let sum = program.machine().memory().read(0).unwrap_or_default();
    println!("Passes: {}", passes);
    println!("Sum:    {} (mod 2^{})", sum, config.word_size);
    print_result(&program);
}

fn list_program(source: &str) {
    let assembly = match assemble(source) {
        Ok(assembly) => assembly,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    for (addr, value) in &assembly.data {
        println!("DAT {} {}", addr, value);
    }
    print!("{}", accu::disassemble(&assembly.instructions));
}
