//! # Ports Layer
//!
//! - `inbound`: what the client offers (`MessageIndexApi`)
//! - `outbound`: what it needs (`HttpRequester`)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
