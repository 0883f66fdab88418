//! # Domain Layer
//!
//! Wire types plus the pure hashing and signing rules.

pub mod content;
pub mod entities;
pub mod errors;
pub mod hashing;
pub mod signing;
