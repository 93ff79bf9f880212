//! Solidity type grammar.

use std::fmt;

use crate::{AbiError, WORD};

/// A Solidity ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintM`, with M the bit width.
    Uint(usize),
    /// `intM`, with M the bit width.
    Int(usize),
    /// `address`.
    Address,
    /// `bool`.
    Bool,
    /// `bytesM`, with M the byte width.
    FixedBytes(usize),
    /// `bytes`.
    Bytes,
    /// `string`.
    String,
    /// `T[]`.
    Array(Box<AbiType>),
    /// `T[k]`.
    FixedArray(Box<AbiType>, usize),
    /// `(T1,T2,...)`.
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Parses a single type such as `uint256`, `(bool,string)[2]` or `bytes32[]`.
    ///
    /// Whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, AbiError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = TypeParser { input: &compact, pos: 0 };
        let ty = parser.parse_type()?;
        if parser.pos != compact.len() {
            return Err(AbiError::UnknownType(compact));
        }
        Ok(ty)
    }

    /// Parses a parenthesized, comma-separated type list such as `(uint256,address)`.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, AbiError> {
        match Self::parse(input)? {
            Self::Tuple(types) => Ok(types),
            other => Err(AbiError::BadSignature(format!("expected a parameter list, got {other}"))),
        }
    }

    /// Whether values of this type are encoded in the tail section.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(inner, _) => inner.is_dynamic(),
            Self::Tuple(types) => types.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    /// Bytes occupied in the head section of an enclosing block.
    pub fn head_size(&self) -> Result<usize, AbiError> {
        if self.is_dynamic() {
            return Ok(WORD);
        }
        let overflow = || AbiError::SizeOverflow(self.to_string());
        match self {
            Self::FixedArray(inner, len) => inner.head_size()?.checked_mul(*len).ok_or_else(overflow),
            Self::Tuple(types) => types
                .iter()
                .try_fold(0usize, |total, ty| total.checked_add(ty.head_size()?).ok_or_else(overflow)),
            _ => Ok(WORD),
        }
    }

    fn elementary(name: &str) -> Result<Self, AbiError> {
        let unknown = || AbiError::UnknownType(name.to_string());
        match name {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "byte" => return Ok(Self::FixedBytes(1)),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            _ => {}
        }
        let sized = |prefix: &str| -> Option<Result<usize, AbiError>> {
            name.strip_prefix(prefix).map(|digits| digits.parse::<usize>().map_err(|_| unknown()))
        };
        if let Some(bits) = sized("uint") {
            let bits = bits?;
            return valid_bits(bits).then_some(Self::Uint(bits)).ok_or_else(unknown);
        }
        if let Some(bits) = sized("int") {
            let bits = bits?;
            return valid_bits(bits).then_some(Self::Int(bits)).ok_or_else(unknown);
        }
        if let Some(size) = sized("bytes") {
            let size = size?;
            return (1..=32).contains(&size).then_some(Self::FixedBytes(size)).ok_or_else(unknown);
        }
        Err(unknown())
    }
}

const fn valid_bits(bits: usize) -> bool {
    bits >= 8 && bits <= 256 && bits % 8 == 0
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
            Self::Tuple(types) => {
                f.write_str("(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
        }
    }
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl TypeParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), AbiError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(AbiError::BadSignature(format!(
                "expected '{}' at position {} in {}",
                byte as char, self.pos, self.input
            )))
        }
    }

    fn parse_type(&mut self) -> Result<AbiType, AbiError> {
        let mut ty = if self.peek() == Some(b'(') { self.parse_tuple()? } else { self.parse_ident()? };
        while self.peek() == Some(b'[') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits = &self.input[start..self.pos];
            self.expect(b']')?;
            ty = if digits.is_empty() {
                AbiType::Array(Box::new(ty))
            } else {
                let len = digits
                    .parse()
                    .map_err(|_| AbiError::UnknownType(format!("{ty}[{digits}]")))?;
                AbiType::FixedArray(Box::new(ty), len)
            };
        }
        Ok(ty)
    }

    fn parse_tuple(&mut self) -> Result<AbiType, AbiError> {
        self.expect(b'(')?;
        let mut types = Vec::new();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(AbiType::Tuple(types));
        }
        loop {
            types.push(self.parse_type()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(AbiType::Tuple(types));
                }
                _ => {
                    return Err(AbiError::BadSignature(format!(
                        "unbalanced parentheses in {}",
                        self.input
                    )));
                }
            }
        }
    }

    fn parse_ident(&mut self) -> Result<AbiType, AbiError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(AbiError::UnknownType(self.input[start..].to_string()));
        }
        AbiType::elementary(&self.input[start..self.pos])
    }
}
