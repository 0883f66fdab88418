//! # Adapters Layer
//!
//! Production implementations of the outbound ports.

pub mod squashfs;

pub use squashfs::{SquashfsPackager, DEFAULT_MKSQUASHFS};
