//! # Domain Layer
//!
//! Wire records, configuration and errors of the index client.

pub mod config;
pub mod entities;
pub mod errors;

pub use config::*;
pub use entities::*;
pub use errors::*;
