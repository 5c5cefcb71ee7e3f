//! Programs and the stepper that runs them on a machine.
//!
//! - [`Program`] - instruction list, counter and split-phase `step`
//! - [`StopHandle`] - cooperative cancellation for `play`

mod stepper;
mod stop;

pub use stepper::{
    Program, ProgramError, ProgramSnapshot, StepOutcome, StepPhase, PlayOutcome,
    DEFAULT_STEP_DELAY,
};
pub use stop::StopHandle;
