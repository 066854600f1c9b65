//! Method metadata as delivered by the external binary reader.
//!
//! The compiler core does not parse metadata itself. It consumes a
//! [`MethodBody`] per method (token, signature, local types and instruction
//! stream) and derives the read-only [`MethodShape`] the state resolver needs.
//!
//! # Key Components
//!
//! - [`token::Token`] - Metadata token identifying methods and types
//! - [`signature::MethodSignature`] / [`signature::SourceType`] - Signature shape and source types
//! - [`MethodBody`] - Per-method input
//! - [`MethodShape`] - Argument/local layout with resolved target types

mod body;
pub mod signature;
pub mod token;

pub use body::{MethodBody, MethodShape};
