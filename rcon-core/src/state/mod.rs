pub mod connection;
mod slot;

pub use connection::{ConnectionPhase, PhaseError};
pub use slot::ConnectionSlot;
