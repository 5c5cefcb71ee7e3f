//! WebAssembly bindings for the accumulator machine.
//!
//! A browser front end drives the machine one step at a time and redraws
//! from the JSON snapshots. Playback timing belongs to the page, so there is
//! no `play` here; `run` is bounded and never sleeps.

use wasm_bindgen::prelude::*;
use crate::{assemble, listing, MachineConfig, Program, StepOutcome};

/// Widest word a JS number holds exactly.
pub const MAX_JS_WORD_WIDTH: u32 = 53;

fn check_js_width(word_size: u32) -> Result<(), String> {
    if word_size > MAX_JS_WORD_WIDTH {
        return Err(format!(
            "word width {} exceeds {} bits, the exact range of a JS number",
            word_size, MAX_JS_WORD_WIDTH
        ));
    }
    Ok(())
}

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly program wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    config: MachineConfig,
    program: Program,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a machine with the given geometry.
    #[wasm_bindgen(constructor)]
    pub fn new(word_size: u32, memory_size: usize) -> Result<WasmMachine, JsError> {
        check_js_width(word_size).map_err(|e| JsError::new(&e))?;
        let config = MachineConfig {
            word_size,
            memory_size,
            step_delay_ms: 0,
        };
        let machine = config.build_machine().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self {
            config,
            program: Program::new(machine),
        })
    }

    /// Replace the program with assembled source. Memory is cleared and
    /// seeded from `DAT` lines. Returns the instruction count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let assembly = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        let mut machine = self
            .config
            .build_machine()
            .map_err(|e| JsError::new(&e.to_string()))?;
        for (addr, value) in &assembly.data {
            machine
                .write(*value, *addr)
                .map_err(|e| JsError::new(&e.to_string()))?;
        }

        let len = assembly.instructions.len();
        self.program = Program::with_instructions(machine, assembly.instructions);
        Ok(len)
    }

    /// Write a memory cell directly.
    #[wasm_bindgen]
    pub fn write(&mut self, value: u64, address: usize) -> Result<(), JsError> {
        self.program
            .machine_mut()
            .write(value, address)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Perform one phase. Returns "decoded", "executed" or "complete".
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let outcome = self.program.step().map_err(|e| JsError::new(&e.to_string()))?;
        let label = match outcome {
            StepOutcome::Decoded(_) => "decoded",
            StepOutcome::Executed(_) => "executed",
            StepOutcome::Complete => "complete",
        };
        Ok(label.to_string())
    }

    /// Step until complete or `max_steps` phases have run.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u32, JsError> {
        let mut steps = 0;
        while steps < max_steps && !self.program.is_complete() {
            self.program.step().map_err(|e| JsError::new(&e.to_string()))?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Move the counter back to the first instruction.
    #[wasm_bindgen]
    pub fn rewind(&mut self) {
        self.program.rewind();
    }

    #[wasm_bindgen]
    pub fn is_complete(&self) -> bool {
        self.program.is_complete()
    }

    #[wasm_bindgen]
    pub fn counter(&self) -> usize {
        self.program.counter()
    }

    #[wasm_bindgen]
    pub fn accumulator(&self) -> u64 {
        self.program.machine().accumulator().value()
    }

    /// Accumulator as a zero-padded binary string.
    #[wasm_bindgen]
    pub fn accumulator_binary(&self) -> String {
        self.program.machine().accumulator().to_binary_string()
    }

    /// All memory cells as a JS array of numbers. Exact, since widths are
    /// capped at [`MAX_JS_WORD_WIDTH`].
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Array {
        self.program
            .machine()
            .memory()
            .cells()
            .iter()
            .map(|cell| JsValue::from_f64(*cell as f64))
            .collect()
    }

    /// Machine snapshot as JSON.
    #[wasm_bindgen]
    pub fn machine_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.program.machine().snapshot())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Program snapshot as JSON.
    #[wasm_bindgen]
    pub fn program_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.program.snapshot())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Numbered listing with the counter marked.
    #[wasm_bindgen]
    pub fn listing(&self) -> String {
        listing(&self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_width_limit() {
        assert!(check_js_width(8).is_ok());
        assert!(check_js_width(MAX_JS_WORD_WIDTH).is_ok());
        assert!(check_js_width(MAX_JS_WORD_WIDTH + 1).is_err());
        assert!(check_js_width(64).is_err());
    }
}
