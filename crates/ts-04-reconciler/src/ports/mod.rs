//! Ports layer: inbound API and outbound dependencies.

pub mod inbound;
pub mod outbound;

pub use inbound::ResourceProvider;
pub use outbound::{MockMessageIndex, MockVolumePackager, PackagedVolume, VolumePackager};
