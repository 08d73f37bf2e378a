//! Setup-time error type.
//!
//! Rendering never returns errors; it degrades (drops notes, deactivates
//! voices, stops at the end of the composition). Everything that can fail
//! happens while assembling a module or reconfiguring a handle, and
//! unwinds without side effects.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KunquatError {
    /// A memory or voice limit was exhausted.
    #[error("resource exhausted: {0}")]
    Resource(&'static str),

    /// Composition data violated a structural constraint.
    #[error("invalid module data: {0}")]
    Format(String),

    /// A configuration argument was out of range.
    #[error("invalid argument: {0}")]
    Argument(String),
}
