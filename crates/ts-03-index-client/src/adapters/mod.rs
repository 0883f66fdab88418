//! # Adapters Layer
//!
//! Production implementations of the outbound ports.

pub mod reqwest_requester;

pub use reqwest_requester::ReqwestRequester;
