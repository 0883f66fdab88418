//! # Domain Layer
//!
//! Pure key-derivation logic with no I/O dependencies.

pub mod entities;
pub mod errors;
pub mod hdwallet;
pub mod keys;
