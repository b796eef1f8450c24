//! Guard-side check-in workflow.
//!
//! The workflow is an explicit state machine:
//! - **State**: where the check-in is and the data gathered so far
//!   (`CheckInState`)
//! - **Events**: what the guard or a device/server call produced (`CheckInEvent`)
//! - **Effects**: the calls to make next (`Effect`)
//! - **Transition**: pure function `(State, Event) -> (State, Vec<Effect>)`
//!
//! `CheckInDriver` performs effects against the scanner, camera and backend
//! and feeds the results back in as events.

pub mod driver;
pub mod effect;
pub mod event;
pub mod machine;
pub mod state;
pub mod transition;

pub use driver::CheckInDriver;
pub use effect::Effect;
pub use event::CheckInEvent;
pub use machine::CheckInMachine;
pub use state::{CheckInState, RetainedCheckIn};
pub use transition::{transition, TransitionResult};

#[cfg(test)]
pub(crate) mod fixtures;
