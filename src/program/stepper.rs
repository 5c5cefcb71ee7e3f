//! The program stepper.
//!
//! A program owns its machine and walks the instruction list one phase at
//! a time: a step either decodes the instruction under the counter or
//! executes the one already decoded and advances. Two steps per
//! instruction, so a viewer can show what is about to happen before it does.

use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cpu::decode::Instruction;
use crate::cpu::execute::{Machine, MachineError, MachinePhase};
use crate::cpu::observer::{ObserverId, Observers};
use crate::error::ErrorKind;
use crate::program::stop::StopHandle;

/// Pause between steps during `play` unless configured otherwise.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(250);

/// Which half of the current instruction the next step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPhase {
    /// Next step decodes the instruction under the counter.
    Fetch,
    /// Next step executes the decoded instruction and advances.
    Decoded,
}

/// What a single `step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Decoded(Instruction),
    Executed(Instruction),
    /// The program had already finished; nothing happened.
    Complete,
}

/// How a `play` loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Completed { steps: usize },
    Stopped { steps: usize },
}

/// Read-only copy of the program state handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub instructions: Vec<Instruction>,
    pub counter: usize,
    pub phase: StepPhase,
    pub complete: bool,
}

/// An instruction list bound to the machine it drives.
pub struct Program {
    instructions: Vec<Instruction>,
    counter: usize,
    phase: StepPhase,
    machine: Machine,
    step_delay: Duration,
    stop: StopHandle,
    observers: Observers<ProgramSnapshot>,
}

impl Program {
    /// An empty program driving `machine`.
    pub fn new(machine: Machine) -> Self {
        Self::with_instructions(machine, Vec::new())
    }

    pub fn with_instructions(machine: Machine, instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            counter: 0,
            phase: StepPhase::Fetch,
            machine,
            step_delay: DEFAULT_STEP_DELAY,
            stop: StopHandle::new(),
            observers: Observers::new(),
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn set_step_delay(&mut self, delay: Duration) {
        self.step_delay = delay;
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    // ==================== Accessors ====================

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Mutable access for seeding memory or attaching machine observers.
    ///
    /// Decoding or executing through this reference bypasses the stepper.
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// True once the counter has moved past the last instruction.
    pub fn is_complete(&self) -> bool {
        self.counter >= self.instructions.len()
    }

    /// The instruction the next step will decode or execute.
    pub fn current(&self) -> Option<Instruction> {
        self.instructions.get(self.counter).copied()
    }

    pub fn snapshot(&self) -> ProgramSnapshot {
        ProgramSnapshot {
            instructions: self.instructions.clone(),
            counter: self.counter,
            phase: self.phase,
            complete: self.is_complete(),
        }
    }

    // ==================== Observers ====================

    /// Subscribe to program snapshots. The subscriber is called once right away.
    pub fn register_observer<F>(&mut self, subscriber: F) -> ObserverId
    where
        F: FnMut(&ProgramSnapshot) + Send + 'static,
    {
        let current = self.snapshot();
        self.observers.register(Box::new(subscriber), &current)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.observers.notify(&snapshot);
    }

    // ==================== Editing ====================

    pub fn append(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.notify();
    }

    /// Insert before `position`; `position == len` appends.
    ///
    /// Inserting ahead of the counter, or at the counter while an
    /// instruction is decoded, shifts the counter so it keeps pointing at
    /// the same instruction.
    pub fn insert(&mut self, instruction: Instruction, position: usize) -> Result<(), ProgramError> {
        let len = self.instructions.len();
        if position > len {
            return Err(ProgramError::InsertOutOfRange { position, len });
        }

        self.sync_phase();
        self.instructions.insert(position, instruction);
        let shifts_counter = position < self.counter
            || (position == self.counter && self.phase == StepPhase::Decoded);
        if shifts_counter {
            self.counter += 1;
        }
        self.notify();
        Ok(())
    }

    /// Move the counter back to the first instruction. Memory is kept.
    pub fn rewind(&mut self) {
        self.counter = 0;
        self.phase = StepPhase::Fetch;
        self.notify();
    }

    // ==================== Execution ====================

    /// Perform one phase of the current instruction.
    ///
    /// If the machine dropped its pending operation behind the program's
    /// back (a reset or a direct `execute` through `machine_mut`), the
    /// instruction under the counter is decoded again instead of executed.
    pub fn step(&mut self) -> Result<StepOutcome, ProgramError> {
        let instruction = match self.current() {
            Some(instruction) => instruction,
            None => return Ok(StepOutcome::Complete),
        };

        self.sync_phase();

        let outcome = match self.phase {
            StepPhase::Fetch => {
                self.machine.decode(&instruction)?;
                self.phase = StepPhase::Decoded;
                StepOutcome::Decoded(instruction)
            }
            StepPhase::Decoded => {
                self.machine.execute()?;
                self.phase = StepPhase::Fetch;
                self.counter += 1;
                StepOutcome::Executed(instruction)
            }
        };

        debug!(counter = self.counter, phase = ?self.phase, "step");
        self.notify();
        Ok(outcome)
    }

    fn sync_phase(&mut self) {
        if self.phase == StepPhase::Decoded && self.machine.phase() == MachinePhase::Idle {
            warn!(counter = self.counter, "decoded instruction lost, decoding again");
            self.phase = StepPhase::Fetch;
        }
    }

    /// Step until the program completes or a stop is requested.
    ///
    /// Sleeps `step_delay` between steps. The stop flag is checked before
    /// each step, never during one.
    pub fn play(&mut self) -> Result<PlayOutcome, ProgramError> {
        if self.is_complete() {
            return Err(ProgramError::AlreadyComplete);
        }
        self.stop.clear();
        info!(counter = self.counter, len = self.len(), delay = ?self.step_delay, "play");

        let mut steps = 0;
        loop {
            if self.stop.is_stop_requested() {
                self.stop.clear();
                info!(counter = self.counter, steps, "play stopped");
                return Ok(PlayOutcome::Stopped { steps });
            }

            self.step()?;
            steps += 1;

            if self.is_complete() {
                info!(steps, cycles = self.machine.cycles(), "play completed");
                return Ok(PlayOutcome::Completed { steps });
            }

            if !self.step_delay.is_zero() {
                std::thread::sleep(self.step_delay);
            }
        }
    }

    /// Ask a running `play` to stop at the next step boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// A handle that can stop `play` from another thread or a subscriber.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("len", &self.instructions.len())
            .field("counter", &self.counter)
            .field("phase", &self.phase)
            .field("machine", &self.machine)
            .finish()
    }
}

/// Errors that can occur while editing or running a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("machine error: {0}")]
    Machine(#[from] MachineError),

    #[error("insert position {position} out of range (0-{len})")]
    InsertOutOfRange { position: usize, len: usize },

    #[error("program already complete")]
    AlreadyComplete,
}

impl ProgramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgramError::Machine(e) => e.kind(),
            ProgramError::InsertOutOfRange { .. } => ErrorKind::OutOfRange,
            ProgramError::AlreadyComplete => ErrorKind::InvalidState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Operation::{self, *};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn adder() -> Vec<Instruction> {
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

    fn program(instructions: Vec<Instruction>) -> Program {
        let mut machine = Machine::new(8, 16).unwrap();
        machine.write(7, 0).unwrap();
        machine.write(1, 1).unwrap();
        Program::with_instructions(machine, instructions).with_step_delay(Duration::ZERO)
    }

    #[test]
    fn test_two_steps_per_instruction() {
        let mut p = program(adder());
        let len = p.len();

        for i in 0..2 * len {
            assert!(!p.is_complete());
            let outcome = p.step().unwrap();
            if i % 2 == 0 {
                assert!(matches!(outcome, StepOutcome::Decoded(_)));
                assert_eq!(p.counter(), i / 2);
            } else {
                assert!(matches!(outcome, StepOutcome::Executed(_)));
                assert_eq!(p.counter(), i / 2 + 1);
            }
        }

        assert!(p.is_complete());
        assert_eq!(p.counter(), len);
        assert_eq!(p.step().unwrap(), StepOutcome::Complete);
        assert_eq!(p.step().unwrap(), StepOutcome::Complete);
        assert_eq!(p.counter(), len);
        assert_eq!(p.machine().cycles(), len as u64);
    }

    #[test]
    fn test_decode_phase_leaves_accumulator() {
        let mut p = program(adder());
        p.step().unwrap();
        assert_eq!(p.phase(), StepPhase::Decoded);
        assert_eq!(p.machine().data_register().value(), 7);
        assert_eq!(p.machine().accumulator().value(), 0);

        p.step().unwrap();
        assert_eq!(p.phase(), StepPhase::Fetch);
        assert_eq!(p.machine().accumulator().value(), 7);
    }

    #[test]
    fn test_play_runs_to_completion() {
        let mut p = program(adder());
        let outcome = p.play().unwrap();

        assert_eq!(outcome, PlayOutcome::Completed { steps: 18 });
        assert_eq!(p.machine().memory().read(0).unwrap(), 6);
        assert_eq!(p.machine().memory().read(1).unwrap(), 2);
    }

    #[test]
    fn test_play_repeated_adds() {
        let mut p = program(adder());
        while p.machine().memory().read(1).unwrap() != 0 {
            p.rewind();
            p.play().unwrap();
        }
        assert_eq!(p.machine().memory().read(0).unwrap(), 8);
    }

    #[test]
    fn test_play_on_complete_program() {
        let mut p = program(Vec::new());
        let err = p.play().unwrap_err();
        assert_eq!(err, ProgramError::AlreadyComplete);
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_stop_from_subscriber_halts_at_boundary() {
        let mut p = program(adder());
        let handle = p.stop_handle();
        p.register_observer(move |s| {
            if s.counter == 3 {
                handle.stop();
            }
        });

        let outcome = p.play().unwrap();
        assert_eq!(outcome, PlayOutcome::Stopped { steps: 6 });
        assert_eq!(p.counter(), 3);
        assert_eq!(p.phase(), StepPhase::Fetch);
        assert_eq!(p.machine().cycles(), 3);
    }

    #[test]
    fn test_play_resumes_after_stop() {
        let mut p = program(adder());
        let handle = p.stop_handle();
        let stops = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&stops);
        p.register_observer(move |s| {
            if s.phase == StepPhase::Decoded {
                handle.stop();
                *seen.lock().unwrap() += 1;
            }
        });

        assert_eq!(p.play().unwrap(), PlayOutcome::Stopped { steps: 1 });
        assert_eq!(p.play().unwrap(), PlayOutcome::Stopped { steps: 2 });
        assert_eq!(*stops.lock().unwrap(), 2);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let instructions = vec![Instruction::op(Operation::Not); 500];
        let mut p = program(instructions).with_step_delay(Duration::from_millis(2));
        let handle = p.stop_handle();

        // One notification per completed step, plus one on registration.
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        p.register_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let worker = std::thread::spawn(move || {
            let outcome = p.play();
            (outcome, p)
        });
        while notified.load(Ordering::SeqCst) < 4 {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.stop();
        let steps_at_stop = notified.load(Ordering::SeqCst) - 1;
        handle.stop();

        let (outcome, p) = worker.join().unwrap();
        let steps = match outcome {
            Ok(PlayOutcome::Stopped { steps }) => steps,
            other => panic!("expected a stop, got {:?}", other),
        };
        assert!(steps >= steps_at_stop);
        assert!(steps <= steps_at_stop + 1);
        assert_eq!(notified.load(Ordering::SeqCst) - 1, steps);
        assert_eq!(2 * p.counter() + usize::from(p.phase() == StepPhase::Decoded), steps);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_insert_bounds() {
        let mut p = program(adder());
        let len = p.len();

        let err = p.insert(Instruction::op(Not), len + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(p.len(), len);

        p.insert(Instruction::op(Not), len).unwrap();
        assert_eq!(p.instructions().last(), Some(&Instruction::op(Not)));
        assert_eq!(p.len(), len + 1);
    }

    #[test]
    fn test_insert_keeps_counter_on_same_instruction() {
        let mut p = program(adder());
        p.step().unwrap();
        p.step().unwrap();
        p.step().unwrap();
        assert_eq!(p.counter(), 1);
        assert_eq!(p.phase(), StepPhase::Decoded);

        p.insert(Instruction::op(Not), 0).unwrap();
        assert_eq!(p.counter(), 2);
        p.insert(Instruction::op(Not), 2).unwrap();
        assert_eq!(p.counter(), 3);
        assert_eq!(p.current(), Some(Instruction::with_address(Xor, 1)));

        assert_eq!(
            p.step().unwrap(),
            StepOutcome::Executed(Instruction::with_address(Xor, 1))
        );
    }

    #[test]
    fn test_append_while_complete_resumes() {
        let mut p = program(vec![Instruction::with_address(Load, 0)]);
        p.play().unwrap();
        assert!(p.is_complete());

        p.append(Instruction::op(Not));
        assert!(!p.is_complete());
        p.play().unwrap();
        assert_eq!(p.machine().accumulator().value(), !7u64 & 0xFF);
    }

    #[test]
    fn test_step_recovers_after_machine_reset() {
        let mut p = program(adder());
        assert_eq!(
            p.step().unwrap(),
            StepOutcome::Decoded(Instruction::with_address(Load, 0))
        );

        p.machine_mut().reset();
        p.machine_mut().write(7, 0).unwrap();
        p.machine_mut().write(1, 1).unwrap();

        assert_eq!(
            p.step().unwrap(),
            StepOutcome::Decoded(Instruction::with_address(Load, 0))
        );
        assert_eq!(p.phase(), StepPhase::Decoded);
        assert_eq!(
            p.step().unwrap(),
            StepOutcome::Executed(Instruction::with_address(Load, 0))
        );
        assert_eq!(p.counter(), 1);
        assert_eq!(p.machine().accumulator().value(), 7);

        assert_eq!(p.play().unwrap(), PlayOutcome::Completed { steps: 16 });
        assert_eq!(p.machine().memory().read(0).unwrap(), 6);
    }

    #[test]
    fn test_step_recovers_after_direct_execute() {
        let mut p = program(adder());
        p.step().unwrap();
        p.machine_mut().execute().unwrap();
        assert_eq!(p.machine().cycles(), 1);

        assert!(matches!(p.step().unwrap(), StepOutcome::Decoded(_)));
        assert!(matches!(p.step().unwrap(), StepOutcome::Executed(_)));
        assert_eq!(p.counter(), 1);
        assert_eq!(p.machine().cycles(), 2);
    }

    #[test]
    fn test_step_error_leaves_counter() {
        let mut p = program(vec![Instruction::with_address(Load, 99)]);
        let err = p.step().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(p.counter(), 0);
        assert_eq!(p.phase(), StepPhase::Fetch);
    }

    #[test]
    fn test_observers_get_each_phase() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut p = program(adder());
        p.register_observer(move |s| sink.lock().unwrap().push((s.counter, s.phase, s.complete)));
        p.play().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1 + 18);
        assert_eq!(seen[0], (0, StepPhase::Fetch, false));
        assert_eq!(seen[1], (0, StepPhase::Decoded, false));
        assert_eq!(seen[2], (1, StepPhase::Fetch, false));
        assert_eq!(*seen.last().unwrap(), (9, StepPhase::Fetch, true));
    }
}
