//! Cross-crate integration scenarios.

pub mod machine_lifecycle;
pub mod volume_lifecycle;
pub mod wire_protocol;
