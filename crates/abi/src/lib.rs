//! Solidity function-signature parser and ABI codec.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod decode;
pub use decode::decode;

mod encode;
pub use encode::{encode, encode_value};

mod error;
pub use error::AbiError;

mod function;
pub use function::{Function, encode_function_call, extract_inputs, selector};

mod literal;
pub use literal::{Literal, parse_argument};

mod types;
pub use types::AbiType;

mod value;
pub use value::AbiValue;

/// Size in bytes of one ABI word.
pub const WORD: usize = 32;
