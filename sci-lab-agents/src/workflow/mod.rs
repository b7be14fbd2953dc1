//! Investigation workflow: the run state machine and the coordinator that
//! drives it.

pub mod coordinator;
pub mod state;

pub use coordinator::*;
pub use state::*;
