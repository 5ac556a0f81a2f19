//! # Lyra Core
//!
//! Shared value and type model for the Lyra language: the runtime
//! constant representation, the declared-type descriptors, and the
//! syntax error type produced by the frontend.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{LyraResult, SyntaxError};
pub use types::TypeTag;
pub use value::Value;

/// Lyra version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
