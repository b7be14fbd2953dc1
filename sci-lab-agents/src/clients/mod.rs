//! External Service Clients
//!
//! Collaborators the agents call out to. Language-model access goes
//! through [`LanguageModel`]; nothing here holds investigation state.

pub mod language_model;

pub use language_model::*;
