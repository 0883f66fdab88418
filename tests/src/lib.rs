//! # TwentySix Provisioner Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Accounts, source folders, wired-up reconcilers
//! └── integration/      # Cross-crate lifecycles
//!     ├── volume_lifecycle.rs
//!     ├── machine_lifecycle.rs
//!     └── wire_protocol.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ts-tests
//! cargo test -p ts-tests integration::volume_lifecycle
//! ```

pub mod fixtures;
pub mod integration;
