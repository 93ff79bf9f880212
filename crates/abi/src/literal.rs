//! Argument literal grammar and conversion to typed values.

use std::str::FromStr;

use alloy_primitives::{Address, I256, Sign, U256};

use crate::{AbiError, AbiType, AbiValue};

/// A parsed argument literal, before it is matched against a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Bare word made of `[A-Za-z0-9_-]`: numbers, booleans, hex.
    Atom(String),
    /// Double-quoted string with escapes resolved.
    Quoted(String),
    /// Parenthesized tuple.
    Tuple(Vec<Literal>),
    /// Bracketed array.
    Array(Vec<Literal>),
}

impl Literal {
    /// Parses a complete literal. Whitespace outside quotes is ignored.
    pub fn parse(input: &str) -> Result<Self, AbiError> {
        let mut parser = LiteralParser { input, pos: 0 };
        let literal = parser.parse_literal()?;
        parser.skip_whitespace();
        if parser.pos != input.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(literal)
    }

    fn describe(&self) -> String {
        match self {
            Self::Atom(s) => s.clone(),
            Self::Quoted(s) => format!("\"{s}\""),
            Self::Tuple(items) => format!("({} items)", items.len()),
            Self::Array(items) => format!("[{} items]", items.len()),
        }
    }
}

/// Parses one call argument for the given type.
///
/// A top-level `string` argument that does not start with a quote is taken verbatim.
pub fn parse_argument(ty: &AbiType, raw: &str) -> Result<AbiValue, AbiError> {
    if *ty == AbiType::String && !raw.trim_start().starts_with('"') {
        return Ok(AbiValue::String(raw.to_string()));
    }
    let literal = Literal::parse(raw)?;
    to_value(ty, &literal)
}

fn to_value(ty: &AbiType, literal: &Literal) -> Result<AbiValue, AbiError> {
    let bad = || AbiError::BadValue { ty: ty.to_string(), value: literal.describe() };
    match (ty, literal) {
        (AbiType::Uint(bits), Literal::Atom(s)) => {
            if s.starts_with('-') {
                return Err(bad());
            }
            let value = U256::from_str(s).map_err(|_| bad())?;
            if *bits < 256 && value.bit_len() > *bits {
                return Err(bad());
            }
            Ok(AbiValue::Uint(value))
        }
        (AbiType::Int(bits), Literal::Atom(s)) => {
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (Sign::Negative, rest),
                None => (Sign::Positive, s.as_str()),
            };
            let abs = U256::from_str(digits).map_err(|_| bad())?;
            if *bits < 256 {
                let limit = U256::from(1) << (*bits - 1);
                let in_range = match sign {
                    Sign::Positive => abs < limit,
                    Sign::Negative => abs <= limit,
                };
                if !in_range {
                    return Err(bad());
                }
            }
            I256::checked_from_sign_and_abs(sign, abs).map(AbiValue::Int).ok_or_else(bad)
        }
        (AbiType::Bool, Literal::Atom(s)) => match s.as_str() {
            "true" => Ok(AbiValue::Bool(true)),
            "false" => Ok(AbiValue::Bool(false)),
            _ => Err(bad()),
        },
        (AbiType::Address, Literal::Atom(s)) => {
            let bytes = decode_hex(s)?;
            if bytes.len() > 20 {
                return Err(bad());
            }
            let mut word = [0u8; 20];
            word[20 - bytes.len()..].copy_from_slice(&bytes);
            Ok(AbiValue::Address(Address::from(word)))
        }
        (AbiType::FixedBytes(size), Literal::Atom(s)) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            if digits.len() != size * 2 {
                return Err(AbiError::BadHex(format!(
                    "bytes{size} needs {} hex characters, got {}",
                    size * 2,
                    digits.len()
                )));
            }
            Ok(AbiValue::FixedBytes(decode_hex(digits)?))
        }
        (AbiType::Bytes, Literal::Atom(s)) => Ok(AbiValue::Bytes(decode_hex(s)?)),
        (AbiType::String, Literal::Quoted(s) | Literal::Atom(s)) => Ok(AbiValue::String(s.clone())),
        (AbiType::Array(inner), Literal::Array(items)) => {
            items.iter().map(|item| to_value(inner, item)).collect::<Result<_, _>>().map(AbiValue::Array)
        }
        (AbiType::FixedArray(inner, len), Literal::Array(items)) => {
            if items.len() != *len {
                return Err(AbiError::ArityMismatch { expected: *len, got: items.len() });
            }
            items.iter().map(|item| to_value(inner, item)).collect::<Result<_, _>>().map(AbiValue::Array)
        }
        (AbiType::Tuple(types), Literal::Tuple(items)) => {
            if items.len() != types.len() {
                return Err(AbiError::ArityMismatch { expected: types.len(), got: items.len() });
            }
            types
                .iter()
                .zip(items)
                .map(|(ty, item)| to_value(ty, item))
                .collect::<Result<_, _>>()
                .map(AbiValue::Tuple)
        }
        _ => Err(bad()),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() % 2 != 0 {
        return Err(AbiError::BadHex(format!("odd number of hex characters in {s}")));
    }
    hex::decode(digits).map_err(|e| AbiError::BadHex(format!("{s}: {e}")))
}

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
}

impl LiteralParser<'_> {
    fn error(&self, message: &str) -> AbiError {
        AbiError::Syntax {
            input: self.input.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, AbiError> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => self.parse_quoted(),
            Some('(') => self.parse_list(')').map(Literal::Tuple),
            Some('[') => self.parse_list(']').map(Literal::Array),
            Some(c) if is_atom_char(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_atom_char) {
                    self.pos += 1;
                }
                Ok(Literal::Atom(self.input[start..self.pos].to_string()))
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_list(&mut self, close: char) -> Result<Vec<Literal>, AbiError> {
        self.bump();
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(close) {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.parse_literal()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(_) => return Err(self.error("expected ',' or closing delimiter")),
                None => return Err(self.error("unexpected end of input")),
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<Literal, AbiError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Literal::Quoted(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

fn is_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ty(s: &str) -> AbiType {
        AbiType::parse(s).expect("type")
    }

    #[test]
    fn test_literal_grammar() {
        let lit = Literal::parse(r#"(200, true, ["a", "b\"c"])"#).expect("parse");
        assert_eq!(
            lit,
            Literal::Tuple(vec![
                Literal::Atom("200".to_string()),
                Literal::Atom("true".to_string()),
                Literal::Array(vec![
                    Literal::Quoted("a".to_string()),
                    Literal::Quoted("b\"c".to_string()),
                ]),
            ])
        );
    }

    #[rstest]
    #[case("(1,")]
    #[case("[1 2]")]
    #[case("\"open")]
    #[case("1)")]
    #[case("")]
    fn test_literal_syntax_errors(#[case] input: &str) {
        assert!(matches!(Literal::parse(input), Err(AbiError::Syntax { .. })));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(
            parse_argument(&ty("uint256[]"), "[]").expect("parse"),
            AbiValue::Array(vec![])
        );
    }

    #[rstest]
    #[case("uint256", "42", AbiValue::uint(42))]
    #[case("uint8", "255", AbiValue::uint(255))]
    #[case("uint256", "0x10", AbiValue::uint(16))]
    #[case("bool", "false", AbiValue::Bool(false))]
    #[case("string", "hello world", AbiValue::String("hello world".to_string()))]
    #[case("string", "\"quoted\"", AbiValue::String("quoted".to_string()))]
    #[case("bytes", "0xdead", AbiValue::Bytes(vec![0xde, 0xad]))]
    #[case("bytes2", "beef", AbiValue::FixedBytes(vec![0xbe, 0xef]))]
    fn test_parse_scalars(#[case] t: &str, #[case] raw: &str, #[case] expected: AbiValue) {
        assert_eq!(parse_argument(&ty(t), raw).expect("parse"), expected);
    }

    #[test]
    fn test_parse_negative_int() {
        let value = parse_argument(&ty("int256"), "-1").expect("parse");
        assert_eq!(value, AbiValue::Int(I256::MINUS_ONE));
        assert!(parse_argument(&ty("int8"), "-128").is_ok());
        assert!(parse_argument(&ty("int8"), "-129").is_err());
        assert!(parse_argument(&ty("int8"), "128").is_err());
    }

    #[rstest]
    #[case("uint256", "-1")]
    #[case("uint8", "256")]
    #[case("bool", "yes")]
    #[case("bool", "1")]
    #[case("address", "0x000000000000000000000000000000000000000000")]
    fn test_parse_bad_values(#[case] t: &str, #[case] raw: &str) {
        assert!(matches!(parse_argument(&ty(t), raw), Err(AbiError::BadValue { .. })));
    }

    #[test]
    fn test_parse_bad_hex() {
        assert!(matches!(parse_argument(&ty("bytes"), "0xabc"), Err(AbiError::BadHex(_))));
        assert!(matches!(parse_argument(&ty("bytes4"), "0xabcd"), Err(AbiError::BadHex(_))));
        assert!(matches!(parse_argument(&ty("bytes"), "0xzz"), Err(AbiError::BadHex(_))));
    }

    #[test]
    fn test_address_is_left_padded() {
        let value = parse_argument(&ty("address"), "0x01").expect("parse");
        let mut expected = [0u8; 20];
        expected[19] = 1;
        assert_eq!(value, AbiValue::Address(Address::from(expected)));
    }

    #[test]
    fn test_fixed_array_arity() {
        assert_eq!(
            parse_argument(&ty("uint256[2]"), "[1,2,3]"),
            Err(AbiError::ArityMismatch { expected: 2, got: 3 })
        );
        assert_eq!(
            parse_argument(&ty("(uint256,bool)"), "(1)"),
            Err(AbiError::ArityMismatch { expected: 2, got: 1 })
        );
    }
}
