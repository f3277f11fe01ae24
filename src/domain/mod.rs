// Domain layer: core models and ports (interfaces). No external dependencies
// beyond std/serde/chrono; all IO lives behind the ports.

pub mod model;
pub mod ports;
