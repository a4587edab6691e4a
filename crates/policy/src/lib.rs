pub mod gate;

pub use gate::{GateConfig, GateError, GateRejection, GateStage, SafetyGate};
