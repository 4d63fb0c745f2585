//! Core types for forge
//!
//! The error taxonomy shared by the access, archive, package, registry and
//! install layers, and its user-facing rendering.

pub mod error;

pub use error::{ErrorContext, ForgeError, ForgeResult, user_friendly_error};
