//! Utility modules for teams-cache-rs.

pub mod build_gate;
pub mod varint;

pub use build_gate::BuildGate;
pub use varint::VarintError;
