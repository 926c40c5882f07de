pub mod classify;
mod connection;

pub use classify::{ErrorClass, classify, is_end_of_stream};
pub use connection::{CorrelationId, Dialer, Reply, Transport};
