//! CLI command implementations

pub mod bench;
pub mod classify;
pub mod domains;
pub mod investigate;
pub mod simulate;
