//! Head/tail encoder.

use alloy_primitives::U256;

use crate::{AbiError, AbiType, AbiValue, WORD};

/// Encodes a parameter list as one argument block.
///
/// Dynamic items leave an offset in the head, measured from the start of the block, and append
/// their encoding to the tail.
pub fn encode(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    if types.len() != values.len() {
        return Err(AbiError::ArgumentCount { expected: types.len(), got: values.len() });
    }
    encode_sequence(types.iter().zip(values))
}

/// Encodes a single value in isolation.
///
/// For static types this is the value's head; for dynamic types it is the self-describing tail
/// that an enclosing block points to.
pub fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
    let mismatch = || AbiError::TypeMismatch(ty.to_string());
    match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if *bits < 256 && v.bit_len() > *bits {
                return Err(mismatch());
            }
            Ok(v.to_be_bytes::<WORD>().to_vec())
        }
        (AbiType::Int(_), AbiValue::Int(v)) => Ok(v.into_raw().to_be_bytes::<WORD>().to_vec()),
        (AbiType::Address, AbiValue::Address(address)) => {
            let mut word = vec![0u8; WORD];
            word[WORD - 20..].copy_from_slice(address.as_slice());
            Ok(word)
        }
        (AbiType::Bool, AbiValue::Bool(flag)) => Ok(uint_word(usize::from(*flag))),
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != *size {
                return Err(mismatch());
            }
            let mut word = bytes.clone();
            word.resize(WORD, 0);
            Ok(word)
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => Ok(encode_bytes(bytes)),
        (AbiType::String, AbiValue::String(s)) => Ok(encode_bytes(s.as_bytes())),
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let mut out = uint_word(items.len());
            out.extend(encode_sequence(items.iter().map(|item| (inner.as_ref(), item)))?);
            Ok(out)
        }
        (AbiType::FixedArray(inner, len), AbiValue::Array(items)) => {
            if items.len() != *len {
                return Err(AbiError::ArityMismatch { expected: *len, got: items.len() });
            }
            encode_sequence(items.iter().map(|item| (inner.as_ref(), item)))
        }
        (AbiType::Tuple(types), AbiValue::Tuple(items)) => {
            if items.len() != types.len() {
                return Err(AbiError::ArityMismatch { expected: types.len(), got: items.len() });
            }
            encode_sequence(types.iter().zip(items))
        }
        _ => Err(mismatch()),
    }
}

fn encode_sequence<'a>(
    pairs: impl Iterator<Item = (&'a AbiType, &'a AbiValue)> + Clone,
) -> Result<Vec<u8>, AbiError> {
    let head_len = pairs.clone().try_fold(0usize, |total, (ty, _)| {
        total.checked_add(ty.head_size()?).ok_or_else(|| AbiError::SizeOverflow(ty.to_string()))
    })?;
    let mut head = Vec::new();
    let mut tail = Vec::new();
    for (ty, value) in pairs {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend(uint_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }
    head.extend(tail);
    Ok(head)
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = uint_word(bytes.len());
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn uint_word(value: usize) -> Vec<u8> {
    U256::from(value).to_be_bytes::<WORD>().to_vec()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, I256};

    use super::*;

    fn word(n: u64) -> Vec<u8> {
        U256::from(n).to_be_bytes::<WORD>().to_vec()
    }

    fn padded(s: &[u8]) -> Vec<u8> {
        let mut w = s.to_vec();
        w.resize(WORD, 0);
        w
    }

    #[test]
    fn test_static_pair() {
        let types = [AbiType::Uint(256), AbiType::Uint(256)];
        let encoded = encode(&types, &[AbiValue::uint(1), AbiValue::uint(2)]).expect("encode");
        assert_eq!(encoded, [word(1), word(2)].concat());
    }

    #[test]
    fn test_negative_int_is_sign_extended() {
        let encoded = encode_value(&AbiType::Int(256), &AbiValue::Int(I256::MINUS_ONE)).expect("encode");
        assert_eq!(encoded, vec![0xff; WORD]);
    }

    #[test]
    fn test_address_and_bool() {
        let address = Address::repeat_byte(0x11);
        let encoded = encode(
            &[AbiType::Address, AbiType::Bool],
            &[AbiValue::Address(address), AbiValue::Bool(true)],
        )
        .expect("encode");
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], address.as_slice());
        assert_eq!(&encoded[32..], word(1).as_slice());
    }

    #[test]
    fn test_fixed_bytes_right_padded() {
        let encoded = encode_value(&AbiType::FixedBytes(2), &AbiValue::FixedBytes(vec![0xbe, 0xef]))
            .expect("encode");
        assert_eq!(encoded, padded(&[0xbe, 0xef]));
    }

    #[test]
    fn test_bytes_layout() {
        let encoded = encode(&[AbiType::Bytes], &[AbiValue::Bytes(vec![1, 2, 3])]).expect("encode");
        assert_eq!(encoded, [word(0x20), word(3), padded(&[1, 2, 3])].concat());
    }

    #[test]
    fn test_bytes_exact_word_has_no_extra_padding() {
        let encoded = encode_value(&AbiType::Bytes, &AbiValue::Bytes(vec![7; 32])).expect("encode");
        assert_eq!(encoded.len(), 64);
    }

    #[test]
    fn test_mixed_static_and_dynamic_offsets() {
        let types = [AbiType::Uint(256), AbiType::String, AbiType::Bool];
        let values = [AbiValue::uint(5), AbiValue::String("hi".to_string()), AbiValue::Bool(false)];
        let encoded = encode(&types, &values).expect("encode");
        let expected = [word(5), word(0x60), word(0), word(2), padded(b"hi")].concat();
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_fixed_array_has_no_length_prefix() {
        let ty = AbiType::FixedArray(Box::new(AbiType::Uint(8)), 2);
        let encoded =
            encode_value(&ty, &AbiValue::Array(vec![AbiValue::uint(1), AbiValue::uint(2)])).expect("encode");
        assert_eq!(encoded, [word(1), word(2)].concat());
    }

    #[test]
    fn test_fixed_array_arity_mismatch() {
        let ty = AbiType::FixedArray(Box::new(AbiType::Uint(8)), 3);
        let err = encode_value(&ty, &AbiValue::Array(vec![AbiValue::uint(1)])).unwrap_err();
        assert_eq!(err, AbiError::ArityMismatch { expected: 3, got: 1 });
    }

    #[test]
    fn test_oversized_fixed_array_is_rejected() {
        let ty = AbiType::parse("uint256[18446744073709551615]").expect("parse");
        let err = encode(&[ty], &[AbiValue::Array(vec![AbiValue::uint(1)])]).unwrap_err();
        assert_eq!(err, AbiError::SizeOverflow("uint256[18446744073709551615]".to_string()));
    }

    #[test]
    fn test_type_mismatch() {
        let err = encode_value(&AbiType::Bool, &AbiValue::uint(1)).unwrap_err();
        assert_eq!(err, AbiError::TypeMismatch("bool".to_string()));
        let err = encode_value(&AbiType::Uint(8), &AbiValue::uint(256)).unwrap_err();
        assert_eq!(err, AbiError::TypeMismatch("uint8".to_string()));
    }

    #[test]
    fn test_argument_count() {
        let err = encode(&[AbiType::Bool], &[]).unwrap_err();
        assert_eq!(err, AbiError::ArgumentCount { expected: 1, got: 0 });
    }
}
