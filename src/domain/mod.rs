//! Core domain types and capability traits

pub mod ports;
pub mod types;

pub use ports::*;
pub use types::*;
