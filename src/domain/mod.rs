//! Domain types and the ports implemented by the infrastructure layer.

pub mod ports;
pub mod transaction;
