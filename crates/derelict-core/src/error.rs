//! Typed errors for text-to-value conversions.

use thiserror::Error;

/// Failure to parse an identifier or enum name from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown {kind} name: {input:?}")]
    UnknownName { kind: &'static str, input: String },

    #[error("invalid {kind} id: {input:?}")]
    InvalidId { kind: &'static str, input: String },
}
