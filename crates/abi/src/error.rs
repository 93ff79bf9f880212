//! ABI codec error types.

use thiserror::Error;

/// Errors raised while parsing signatures, parsing argument literals, encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The function signature is malformed or its parentheses are unbalanced.
    #[error("bad function signature: {0}")]
    BadSignature(String),

    /// A type name is not a Solidity elementary type.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A fixed-size array or tuple received the wrong number of elements.
    #[error("arity mismatch: expected {expected} elements, got {got}")]
    ArityMismatch {
        /// Declared element count.
        expected: usize,
        /// Provided element count.
        got: usize,
    },

    /// The number of call arguments does not match the signature.
    #[error("argument count mismatch: signature takes {expected}, got {got}")]
    ArgumentCount {
        /// Parameters in the signature.
        expected: usize,
        /// Provided arguments.
        got: usize,
    },

    /// A hex value has odd length, bad characters or the wrong size.
    #[error("bad hex value: {0}")]
    BadHex(String),

    /// A literal cannot be converted to the requested type.
    #[error("invalid value {value:?} for type {ty}")]
    BadValue {
        /// Canonical type name.
        ty: String,
        /// Offending literal.
        value: String,
    },

    /// An argument literal does not follow the value grammar.
    #[error("syntax error at position {position} in {input:?}: {message}")]
    Syntax {
        /// Full literal being parsed.
        input: String,
        /// Byte offset of the error.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A value variant does not fit the type it is encoded as.
    #[error("value does not match type {0}")]
    TypeMismatch(String),

    /// Encoded data ended before the value was complete.
    #[error("encoded data truncated at offset {0}")]
    Truncated(usize),

    /// Encoded data is well-sized but not a valid encoding.
    #[error("invalid encoded data: {0}")]
    InvalidData(String),

    /// The encoded size of a type does not fit in memory.
    #[error("encoded size of {0} overflows")]
    SizeOverflow(String),
}
