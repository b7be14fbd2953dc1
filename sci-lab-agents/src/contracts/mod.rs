//! Investigation Contracts
//!
//! Data types exchanged between the classifier, the agents and the
//! workflow coordinator. Agents import their input and output types
//! exclusively from this module.

pub mod classification;
pub mod common;
pub mod conclusion;
pub mod domain;
pub mod experiment;
pub mod hypothesis;
pub mod model;
pub mod stage_record;

pub use classification::*;
pub use common::*;
pub use conclusion::*;
pub use domain::*;
pub use experiment::*;
pub use hypothesis::*;
pub use model::*;
pub use stage_record::*;
