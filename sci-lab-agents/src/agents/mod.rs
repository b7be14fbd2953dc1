//! Investigation Agents
//!
//! - `TheoreticalAgent`: question to hypothesis and candidate model
//! - `ExperimentalAgent`: hypothesis to simulated data and analysis
//! - `CollectorAgent`: hypothesis and experiment to conclusion
//!
//! Every agent is stateless between invocations and produces one
//! `StageRecord` per `invoke`.

pub mod catalog;
pub mod collector;
pub mod experimental;
pub mod telemetry;
pub mod theoretical;
pub mod traits;

pub use catalog::*;
pub use collector::*;
pub use experimental::*;
pub use telemetry::*;
pub use theoretical::*;
pub use traits::*;
